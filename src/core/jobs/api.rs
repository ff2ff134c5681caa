//! Job API calls
//!
//! Every call goes through the intercepted client, so an expired access token
//! is refreshed once before the caller sees a failure:
//! - GET api/v1/job - List jobs
//! - GET api/v1/job/{id} - Job details with applications
//! - POST api/v1/job - Create a job
//! - GET api/v1/job/skills - Available skills
//! - POST api/v1/job/{id}/apply - Apply with a multipart form
//! - GET api/v1/job/{id}/applications - Applications for a job

use crate::core::auth::error::{ApiError, Operation};
use crate::core::auth::http::{ApiRequest, HttpClient};

use super::models::{
    CreateJobRequest, Job, JobApplication, JobApplicationRequest, JobSummary, Skill,
};

pub const JOBS_PATH: &str = "api/v1/job";
pub const SKILLS_PATH: &str = "api/v1/job/skills";

fn job_path(id: u64) -> String {
    format!("{}/{}", JOBS_PATH, id)
}

/// Job endpoint client
#[derive(Clone)]
pub struct JobsApi {
    client: HttpClient,
}

impl JobsApi {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>, ApiError> {
        self.client
            .fetch_json(Operation::ListJobs, ApiRequest::get(JOBS_PATH))
            .await
    }

    pub async fn job_detail(&self, id: u64) -> Result<Job, ApiError> {
        self.client
            .fetch_json(Operation::JobDetail, ApiRequest::get(job_path(id)))
            .await
    }

    /// Validate and post a new job
    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError> {
        request.validate()?;

        let request = ApiRequest::post(JOBS_PATH).json(request)?;
        let job: Job = self.client.fetch_json(Operation::CreateJob, request).await?;

        tracing::info!("Created job {}: {}", job.id, job.title);
        Ok(job)
    }

    pub async fn list_skills(&self) -> Result<Vec<Skill>, ApiError> {
        self.client
            .fetch_json(Operation::ListSkills, ApiRequest::get(SKILLS_PATH))
            .await
    }

    /// Submit an application; attachments are sent as `files` parts
    pub async fn apply_for_job(
        &self,
        id: u64,
        application: &JobApplicationRequest,
    ) -> Result<(), ApiError> {
        application.validate()?;

        let request =
            ApiRequest::post(format!("{}/apply", job_path(id))).multipart(application.to_parts()?);
        self.client
            .fetch_empty(Operation::ApplyForJob, request)
            .await?;

        tracing::info!(
            "Applied for job {} with {} attachment(s)",
            id,
            application.attachments.len()
        );
        Ok(())
    }

    pub async fn list_applications(&self, id: u64) -> Result<Vec<JobApplication>, ApiError> {
        self.client
            .fetch_json(
                Operation::ListApplications,
                ApiRequest::get(format!("{}/applications", job_path(id))),
            )
            .await
    }
}
