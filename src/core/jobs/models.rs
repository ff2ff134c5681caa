//! Job marketplace data transfer objects
//!
//! All types use camelCase on the wire. Listing and detail payloads are read
//! leniently: missing fields fall back to their defaults.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::auth::error::ApiError;
use crate::core::auth::http::FormPart;

/// Row of the job listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSummary {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub status: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    /// Preformatted salary range
    pub salary: Option<String>,
    pub skills: Vec<String>,
    pub created_at: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}

/// Full job, as returned by the detail and create endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Job {
    pub id: u64,
    pub title: String,
    /// HTML produced by the rich-text editor
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub status: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub skills: Vec<String>,
    pub created_at: Option<String>,
    pub location: Option<String>,
    pub client_name: Option<String>,
    pub job_applications: Vec<JobApplication>,
}

/// Application submitted by a freelancer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: u64,
    #[serde(default)]
    pub cover_letter: Option<String>,
    /// Sent as a number or a numeric string
    #[serde(default, deserialize_with = "lenient_number")]
    pub expected_fee: Option<f64>,
    /// Free text such as `"2 weeks"`, or a bare number
    #[serde(default, deserialize_with = "lenient_text")]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub freelancer_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Some(n.to_string()),
        Some(NumberOrText::Text(s)) => Some(s),
        None => None,
    })
}

/// Skill that can be attached to a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub public_id: String,
    pub name: String,
}

/// New job posting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub benefits: String,
    pub budget_min: f64,
    pub budget_max: f64,
    /// Skill public ids
    pub skills: Vec<String>,
}

impl CreateJobRequest {
    /// Reject postings the backend would refuse
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "Please input the job title!".to_string(),
            ));
        }
        if self.skills.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Please select at least one skill!".to_string(),
            ));
        }
        if !self.budget_min.is_finite() || !self.budget_max.is_finite() || self.budget_min < 0.0 {
            return Err(ApiError::InvalidRequest("Budget must be a positive amount".to_string()));
        }
        if self.budget_max < self.budget_min {
            return Err(ApiError::InvalidRequest(
                "Maximum budget cannot be less than minimum budget".to_string(),
            ));
        }
        Ok(())
    }
}

/// File attached to an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// Application form, sent as multipart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobApplicationRequest {
    pub cover_letter: String,
    pub expected_fee: f64,
    pub estimated_time: String,
    pub attachments: Vec<Attachment>,
}

/// JSON carried in the `data` part; every value travels as a string
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationData<'a> {
    cover_letter: &'a str,
    expected_fee: String,
    estimated_time: &'a str,
}

impl JobApplicationRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.cover_letter.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "Please enter your cover letter".to_string(),
            ));
        }
        if !self.expected_fee.is_finite() || self.expected_fee < 0.0 {
            return Err(ApiError::InvalidRequest(
                "Please enter your expected fee".to_string(),
            ));
        }
        if self.estimated_time.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "Please enter estimated time".to_string(),
            ));
        }
        Ok(())
    }

    /// Multipart fields: a `data` JSON part followed by one `files` part per attachment
    pub fn to_parts(&self) -> Result<Vec<FormPart>, ApiError> {
        let data = serde_json::to_string(&ApplicationData {
            cover_letter: &self.cover_letter,
            expected_fee: self.expected_fee.to_string(),
            estimated_time: &self.estimated_time,
        })?;

        let mut parts = vec![FormPart::Text {
            name: "data".to_string(),
            value: data,
        }];
        parts.extend(self.attachments.iter().map(|file| FormPart::File {
            name: "files".to_string(),
            file_name: file.file_name.clone(),
            mime: file.mime.clone(),
            bytes: file.bytes.clone(),
        }));
        Ok(parts)
    }
}
