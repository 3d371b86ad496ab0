use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub path_with_namespace: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored subtitle. Timestamps are kept as formatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleRow {
    pub id: String,
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub start_time: String,
    pub end_time: String,
    pub content: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInput {
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub start_after: Option<String>,
    pub end_before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub start_time: String,
    pub end_time: String,
    pub content: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInput {
    pub id: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub content: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteInput {
    pub id: String,
}

/// The persistence collaborator the editor talks to.
pub trait SubtitleStore {
    fn project(&self, id: &str) -> Result<Option<Project>>;
    fn put_project(&mut self, project: Project) -> Result<()>;
    fn list(&self, input: &ListInput) -> Result<Vec<SubtitleRow>>;
    fn create(&mut self, input: CreateInput) -> Result<SubtitleRow>;
    fn update(&mut self, input: UpdateInput) -> Result<Option<SubtitleRow>>;
    fn delete(&mut self, input: DeleteInput) -> Result<bool>;
}

/// Row id for a subtitle: one row per project and start time.
pub fn row_id(project_id: &str, start_time: &str) -> String {
    format!("{project_id}_{start_time}")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub subtitles: Vec<SubtitleRow>,
}

impl SubtitleStore for MemoryStore {
    fn project(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.projects.iter().find(|p| p.id == id).cloned())
    }

    fn put_project(&mut self, project: Project) -> Result<()> {
        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => {
                existing.path_with_namespace = project.path_with_namespace;
                existing.description = project.description;
                existing.updated_at = Utc::now();
            }
            None => self.projects.push(project),
        }
        Ok(())
    }

    fn list(&self, input: &ListInput) -> Result<Vec<SubtitleRow>> {
        let mut rows: Vec<SubtitleRow> = self
            .subtitles
            .iter()
            .filter(|r| r.project_id == input.project_id)
            .filter(|r| {
                input
                    .start_after
                    .as_deref()
                    .is_none_or(|a| r.start_time.as_str() >= a)
            })
            .filter(|r| {
                input
                    .end_before
                    .as_deref()
                    .is_none_or(|b| r.end_time.as_str() <= b)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(rows)
    }

    fn create(&mut self, input: CreateInput) -> Result<SubtitleRow> {
        let id = row_id(&input.project_id, &input.start_time);
        let now = Utc::now();

        if let Some(existing) = self.subtitles.iter_mut().find(|r| r.id == id) {
            tracing::debug!(id = id.as_str(), "create overwrites existing row");
            existing.end_time = input.end_time;
            existing.content = input.content;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let row = SubtitleRow {
            id,
            project_id: input.project_id,
            start_time: input.start_time,
            end_time: input.end_time,
            content: input.content,
            created_at: now,
            updated_at: now,
        };
        self.subtitles.push(row.clone());
        Ok(row)
    }

    fn update(&mut self, input: UpdateInput) -> Result<Option<SubtitleRow>> {
        let Some(row) = self.subtitles.iter_mut().find(|r| r.id == input.id) else {
            return Ok(None);
        };
        if let Some(s) = input.start_time.filter(|s| !s.is_empty()) {
            row.start_time = s;
        }
        if let Some(e) = input.end_time.filter(|e| !e.is_empty()) {
            row.end_time = e;
        }
        if let Some(c) = input.content {
            row.content = c;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    fn delete(&mut self, input: DeleteInput) -> Result<bool> {
        self.subtitles.retain(|r| r.id != input.id);
        Ok(true)
    }
}

/// A [`MemoryStore`] that is loaded from and flushed to a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self> {
        let inner = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading store file: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed parsing store file: {}", path.display()))?
        } else {
            MemoryStore::default()
        };

        tracing::debug!(
            path = %path.display(),
            projects = inner.projects.len(),
            subtitles = inner.subtitles.len(),
            "store opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating store dir: {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(&self.inner)?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed writing store file: {}", self.path.display()))?;
        Ok(())
    }
}

impl SubtitleStore for JsonFileStore {
    fn project(&self, id: &str) -> Result<Option<Project>> {
        self.inner.project(id)
    }

    fn put_project(&mut self, project: Project) -> Result<()> {
        self.inner.put_project(project)?;
        self.flush()
    }

    fn list(&self, input: &ListInput) -> Result<Vec<SubtitleRow>> {
        self.inner.list(input)
    }

    fn create(&mut self, input: CreateInput) -> Result<SubtitleRow> {
        let row = self.inner.create(input)?;
        self.flush()?;
        Ok(row)
    }

    fn update(&mut self, input: UpdateInput) -> Result<Option<SubtitleRow>> {
        let row = self.inner.update(input)?;
        if row.is_some() {
            self.flush()?;
        }
        Ok(row)
    }

    fn delete(&mut self, input: DeleteInput) -> Result<bool> {
        let before = self.inner.subtitles.len();
        let ok = self.inner.delete(input)?;
        if self.inner.subtitles.len() != before {
            self.flush()?;
        }
        Ok(ok)
    }
}
