//! Race state producers: live CSV ingest and simulation.

mod live;
mod simulate;

pub use live::CsvIngestor;
pub use simulate::SimulatedSource;
