use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Duration;
use trainer_booking::{
    domain::schedule::{AppointmentRepository, AvailabilityScanner, BlockingRule, BusinessCalendar},
    DEFAULT_MAX_WINDOW_DAYS,
};

pub mod envelope;
pub mod handlers;
pub mod params;

/// ハンドラ間で共有する状態。起動時に作り、以降は読み取りのみ
#[derive(Clone)]
pub struct AppState {
    calendar: Arc<BusinessCalendar>,
    blocking: BlockingRule,
    max_window: Duration,
    repository: Arc<dyn AppointmentRepository>,
}

impl AppState {
    pub fn new(
        calendar: BusinessCalendar,
        blocking: BlockingRule,
        repository: Arc<dyn AppointmentRepository>,
    ) -> Self {
        Self {
            calendar: Arc::new(calendar),
            blocking,
            max_window: Duration::days(DEFAULT_MAX_WINDOW_DAYS),
            repository,
        }
    }

    pub fn with_max_window(mut self, max_window: Duration) -> Self {
        self.max_window = max_window;
        self
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    /// 一度に検索できる期間
    pub fn max_window(&self) -> Duration {
        self.max_window
    }

    pub fn repository(&self) -> &dyn AppointmentRepository {
        self.repository.as_ref()
    }

    pub fn scanner(&self) -> AvailabilityScanner<'_> {
        AvailabilityScanner::new(&self.calendar).with_rule(self.blocking)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/trainers/:trainer_id/appointments",
            get(handlers::trainer_appointments),
        )
        .route("/appointments", post(handlers::create_appointment))
        .route(
            "/appointments/scheduled",
            get(handlers::scheduled_appointments),
        )
        .route(
            "/appointments/available",
            get(handlers::available_appointments),
        )
        .fallback(handlers::not_found)
        .with_state(state)
}
