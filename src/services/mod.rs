pub mod payment_service;

pub use payment_service::{InitiatedPayment, PaymentService, ServiceError, ServiceResult};
