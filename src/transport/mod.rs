mod http;
mod socket;

pub use http::bind_http_transport;
pub use socket::SocketTransport;
