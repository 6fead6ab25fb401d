pub mod transport;
pub mod gateway;
#[cfg(test)]
pub(crate) mod testing;

pub use transport::{HttpReply, HttpTransport, TileTransport};
pub use gateway::{RemoteTileGateway, STATS_PATH};
