//! Job marketplace endpoints built on the authenticated client

pub mod api;
pub mod models;

pub use api::JobsApi;
pub use models::{
    Attachment, CreateJobRequest, Job, JobApplication, JobApplicationRequest, JobSummary, Skill,
};
