pub mod alpha_vantage;
pub mod provider;
pub mod retriever;
pub mod types;
pub mod yahoo;
