use std::sync::Arc;

use crate::config::Config;
use crate::store::SharedStore;
use crate::utils::{generate_hex_id, time_us};


const QID_LENGTH: u32 = 8;

/// Per-connection state: request id, timing and the shared server state
pub struct Context {
    pub qid: String,
    pub start_time_us: u128,
    pub finish_time_us: u128,
    pub store: SharedStore,
    pub cfg: Arc<Config>,
}

impl Context {
    pub fn new(store: SharedStore, cfg: Arc<Config>) -> Context {
        Context {
            qid: generate_hex_id(QID_LENGTH),
            start_time_us: time_us(),
            finish_time_us: 0,
            store,
            cfg,
        }
    }

    pub fn fix(&mut self) {
        self.finish_time_us = time_us();
    }

    pub fn time_ms(&self) -> f32 {
        (self.finish_time_us.saturating_sub(self.start_time_us) as f32) / 1000.0
    }
}
