//! Request pacing shared by the provider clients.

mod request_queue;

pub use request_queue::RequestQueue;
