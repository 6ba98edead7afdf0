//! Security controls around contract mutations.
//!
//! # Audit Logging
//!
//! The audit module provides structured logging for contract mutations with
//! user-id and contact redaction:
//!
//! ```rust
//! use contract_engine::security::audit::{AuditEvent, AuditEventType};
//! use uuid::Uuid;
//!
//! let event = AuditEvent::new(AuditEventType::ContractCreated, "user-456", Uuid::new_v4())
//!     .with_selection("petclinic@2024", "basic");
//!
//! contract_engine::security::audit::audit_log(&event);
//! ```
//!
//! # Security Considerations
//!
//! - Audit logs use a separate tracing target for easy filtering
//! - User ids are partially redacted, contact emails masked
//! - Request correlation IDs tie together the lines of one manager call

pub mod audit;

pub use audit::{
    AuditDetails, AuditEvent, AuditEventType, audit_log, redact_sensitive, redact_user_id,
};
