use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "UPAZILA")]
    Upazila,
    #[serde(rename = "SCHOOL")]
    School,
}

impl UserRole {
    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "ADMIN" => Some(UserRole::Admin),
            "UPAZILA" => Some(UserRole::Upazila),
            "SCHOOL" => Some(UserRole::School),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Upazila => "UPAZILA",
            UserRole::School => "SCHOOL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upazila {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: String,
    pub name: String,
    pub ipemis_code: String,
    pub upazila_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upazila_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
}

impl User {
    /// Wire view of a user. Credentials never leave the store, not even the
    /// hash; the clients only ever see this shape.
    pub fn public_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role.as_str(),
            "designation": self.designation,
            "mobile": self.mobile,
            "division": self.division,
            "district": self.district,
            "upazilaId": self.upazila_id,
            "schoolId": self.school_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "TEXTAREA")]
    Textarea,
    #[serde(rename = "NUMBER")]
    Number,
    #[serde(rename = "DROPDOWN")]
    Dropdown,
    #[serde(rename = "MULTI_SELECT")]
    MultiSelect,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "BOOLEAN")]
    Boolean,
    #[serde(rename = "TABLE")]
    Table,
    #[serde(rename = "FILE")]
    File,
}

/// One field of a form. TABLE fields carry their column schema in
/// `sub_fields` and, when the author pinned the rows, the row labels in
/// `row_labels`; every other type ignores both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_fields: Option<Vec<FormField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_labels: Option<Vec<String>>,
}

impl FormField {
    pub fn fixed_rows(&self) -> Option<&[String]> {
        match self.row_labels.as_deref() {
            Some(labels) if !labels.is_empty() => Some(labels),
            _ => None,
        }
    }
}

/// `upazila_id` absent means a global form authored by the admin tier,
/// visible to every school; present means the form belongs to that upazila
/// office and is visible only inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    pub title: String,
    pub description: String,
    pub fields: Vec<FormField>,
    pub is_active: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upazila_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "SUBMITTED")]
    Submitted,
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "LOCKED")]
    Locked,
}

impl SubmissionStatus {
    pub fn parse(s: &str) -> Option<SubmissionStatus> {
        match s {
            "PENDING" => Some(SubmissionStatus::Pending),
            "SUBMITTED" => Some(SubmissionStatus::Submitted),
            "APPROVED" => Some(SubmissionStatus::Approved),
            "LOCKED" => Some(SubmissionStatus::Locked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Submitted => "SUBMITTED",
            SubmissionStatus::Approved => "APPROVED",
            SubmissionStatus::Locked => "LOCKED",
        }
    }

    /// SUBMITTED, APPROVED and LOCKED all read as "the school has handed the
    /// data in" for completion statistics.
    pub fn counts_as_submitted(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Submitted | SubmissionStatus::Approved | SubmissionStatus::Locked
        )
    }
}

/// At most one submission exists per (form_id, school_id); saves upsert on
/// that composite key. `data` maps field id to a value whose shape is
/// validated against the form schema at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    pub school_id: String,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub status: SubmissionStatus,
    pub submitted_at: String,
    pub updated_at: String,
}
