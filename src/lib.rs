pub mod api;
pub mod availability;
pub mod booking;
pub mod config;
pub mod db;
pub mod notifications;
pub mod storage;
pub mod utils;

pub use db::DbPool;

use config::Config;

use crate::booking::BookingEngine;
use crate::notifications::ReservationMailer;
use crate::storage::ImageStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub booking: BookingEngine,
    pub mailer: ReservationMailer,
    /// None when no bucket is configured; image endpoints then return 503.
    pub images: Option<ImageStore>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, images: Option<ImageStore>) -> Self {
        let booking = BookingEngine::new(db.clone());
        let mailer = ReservationMailer::new(config.email.clone());
        Self {
            config,
            db,
            booking,
            mailer,
            images,
        }
    }
}
