pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        upstream: String,
        cookie_name: String,
    },
}
