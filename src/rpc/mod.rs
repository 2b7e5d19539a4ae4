pub mod envelope;
pub mod router;

pub use router::{RaceRouter, RaceWinner, RpcEndpoint};
