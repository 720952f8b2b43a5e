// ============================================================================
// Module : api
// ============================================================================
// Contrat HTTP entre le viewer et le backend d'ingestion :
// - wire : structures JSON partagées (serveur et client)
// - client : appels HTTP du viewer vers le backend
// ============================================================================

pub mod client;
pub mod wire;

pub use client::{BackendClient, BACKEND_UNREACHABLE, PROCESSING_FAILED};
