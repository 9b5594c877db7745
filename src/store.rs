use crate::model::{Form, School, Submission, Upazila, User};
use std::path::{Path, PathBuf};

/// The whole state of one workspace, held in memory and snapshotted to six
/// named JSON blobs. Each blob is the full collection; there is no schema
/// versioning and no differential write. `session.json` holds the currently
/// authenticated user and is removed on logout.
pub struct Store {
    root: PathBuf,
    pub users: Vec<User>,
    pub forms: Vec<Form>,
    pub submissions: Vec<Submission>,
    pub upazilas: Vec<Upazila>,
    pub schools: Vec<School>,
    pub session: Option<User>,
}

const USERS: &str = "users.json";
const FORMS: &str = "forms.json";
const SUBMISSIONS: &str = "submissions.json";
const UPAZILAS: &str = "upazilas.json";
const SCHOOLS: &str = "schools.json";
const SESSION: &str = "session.json";

impl Store {
    pub fn open(workspace: &Path) -> anyhow::Result<Store> {
        std::fs::create_dir_all(workspace)?;
        Ok(Store {
            root: workspace.to_path_buf(),
            users: load_collection(workspace, USERS)?,
            forms: load_collection(workspace, FORMS)?,
            submissions: load_collection(workspace, SUBMISSIONS)?,
            upazilas: load_collection(workspace, UPAZILAS)?,
            schools: load_collection(workspace, SCHOOLS)?,
            session: load_session(workspace)?,
        })
    }

    /// The single synchronization point: every mutation ends here, rewriting
    /// all six blobs wholesale. Last write wins per blob.
    pub fn save(&self) -> anyhow::Result<()> {
        write_blob(&self.root, USERS, &self.users)?;
        write_blob(&self.root, FORMS, &self.forms)?;
        write_blob(&self.root, SUBMISSIONS, &self.submissions)?;
        write_blob(&self.root, UPAZILAS, &self.upazilas)?;
        write_blob(&self.root, SCHOOLS, &self.schools)?;
        match &self.session {
            Some(user) => write_blob(&self.root, SESSION, user)?,
            None => {
                let p = self.root.join(SESSION);
                if p.exists() {
                    std::fs::remove_file(p)?;
                }
            }
        }
        Ok(())
    }

    pub fn user_by_identifier(&self, identifier: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.email == identifier || u.mobile.as_deref() == Some(identifier))
    }

    pub fn upazila_by_name(&self, name: &str) -> Option<&Upazila> {
        self.upazilas.iter().find(|u| u.name == name)
    }

    pub fn form(&self, form_id: &str) -> Option<&Form> {
        self.forms.iter().find(|f| f.id == form_id)
    }

    pub fn school(&self, school_id: &str) -> Option<&School> {
        self.schools.iter().find(|s| s.id == school_id)
    }

    pub fn submission_for(&self, form_id: &str, school_id: &str) -> Option<&Submission> {
        self.submissions
            .iter()
            .find(|s| s.form_id == form_id && s.school_id == school_id)
    }
}

fn load_collection<T: serde::de::DeserializeOwned>(
    workspace: &Path,
    name: &str,
) -> anyhow::Result<Vec<T>> {
    let path = workspace.join(name);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn load_session(workspace: &Path) -> anyhow::Result<Option<User>> {
    let path = workspace.join(SESSION);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

fn write_blob<T: serde::Serialize>(root: &Path, name: &str, value: &T) -> anyhow::Result<()> {
    let payload = serde_json::to_string(value)?;
    std::fs::write(root.join(name), payload)?;
    Ok(())
}
