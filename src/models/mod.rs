// ============================================================================
// Module : models
// ============================================================================
// Structures de données : chandelles, trades, données synchronisées du
// graphique et fenêtre de zoom
// ============================================================================

pub mod datetime;   // Format d'échange des timestamps (serde + parsing)
pub mod ohlc;       // Chandelle OHLCV et granularité de l'axe X
pub mod trade;      // Trade et sens (Long / Short)
pub mod chart_data; // Chandelles + trades synchronisés par timestamp
pub mod viewport;   // Zoom / déplacement horizontal

// Re-export des structures principales pour simplifier les imports
pub use chart_data::{ChartData, Tooltip, TradeMarker};
pub use ohlc::{price_range, TimeUnit, OHLC};
pub use trade::{Direction, Trade};
pub use viewport::Viewport;
