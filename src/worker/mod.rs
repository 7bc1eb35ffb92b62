// Client-side worker model and the proxy that stands in for it at the gateway.

pub mod client;
pub mod proxy;

pub use client::WorkerClient;
pub use proxy::WorkerProxy;
