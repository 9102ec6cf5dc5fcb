use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::config::Config;

pub type SharedState = Arc<State>;

pub struct State {
    pub config: Config,
    pub conn: Mutex<Connection>,
    pub clock: Arc<dyn Clock>,
}

impl State {
    pub fn new(config: Config, conn: Connection, clock: Arc<dyn Clock>) -> SharedState {
        Arc::new(Self {
            config,
            conn: Mutex::new(conn),
            clock,
        })
    }
}
