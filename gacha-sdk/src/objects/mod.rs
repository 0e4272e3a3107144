pub mod bet;

pub use bet::{BetStatusResponse, ErrorResponse, PlaceBetRequest, PlaceBetResponse};
