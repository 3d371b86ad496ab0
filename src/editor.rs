use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};

use crate::{
    config::EditorCfg,
    formats::{self, Format, time},
    model::{Content, RecordId, SubtitleRecord, sort_by_start},
    store::{CreateInput, DeleteInput, ListInput, SubtitleRow, SubtitleStore, UpdateInput},
    timeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Result of editing a timestamp from text.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeEdit {
    Applied(f64),
    /// The text was not a timecode; the field should show `revert_to` again.
    Rejected { revert_to: String },
}

/// Local subtitle state for one project, kept in sync with a store.
///
/// Mutations apply locally first. Store calls follow, and a successful call is
/// followed by a refresh from the store. A failed call is logged and returned;
/// the local state is left as it is.
pub struct Editor<S: SubtitleStore> {
    project_id: String,
    records: Vec<SubtitleRecord>,
    store: S,
    cfg: EditorCfg,
}

impl<S: SubtitleStore> Editor<S> {
    pub fn new(project_id: impl Into<String>, store: S, cfg: EditorCfg) -> Self {
        Self {
            project_id: project_id.into(),
            records: Vec::new(),
            store,
            cfg,
        }
    }

    pub fn open(project_id: impl Into<String>, store: S, cfg: EditorCfg) -> Result<Self> {
        let mut ed = Self::new(project_id, store, cfg);
        ed.refresh()?;
        Ok(ed)
    }

    pub fn records(&self) -> &[SubtitleRecord] {
        &self.records
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn active_index(&self, t: f64) -> Option<usize> {
        timeline::active_index(t, &self.records)
    }

    pub fn refresh(&mut self) -> Result<()> {
        self.refresh_with(&ListInput {
            project_id: self.project_id.clone(),
            ..Default::default()
        })
    }

    pub fn refresh_with(&mut self, input: &ListInput) -> Result<()> {
        let rows = self
            .store
            .list(input)
            .with_context(|| format!("failed listing subtitles for {}", self.project_id))?;
        let mut records: Vec<SubtitleRecord> = rows.iter().map(record_from_row).collect();
        sort_by_start(&mut records);
        tracing::debug!(project = self.project_id.as_str(), count = records.len(), "refreshed");
        self.records = records;
        Ok(())
    }

    /// Adds an empty cue at `position` and proposes it to the store.
    pub fn add_at(&mut self, position: f64, media_duration: Option<f64>) -> Result<RecordId> {
        let start = position.max(0.0);
        let mut end = start + self.cfg.default_cue_secs;
        if let Some(d) = media_duration.filter(|d| *d > 0.0 && d.is_finite()) {
            end = end.min(d).max(start);
        }

        let row = SubtitleRecord::pending(start, end, Content::default());
        let id = row.id.clone();
        let input = create_input(&self.project_id, &row);
        self.records.push(row);
        sort_by_start(&mut self.records);

        tracing::info!(start, end, "added cue");
        self.sync(|store| store.create(input).map(|_| ()), "create")?;
        Ok(id)
    }

    pub fn edit_start(&mut self, id: &RecordId, secs: f64) -> Result<f64> {
        let r = self.get_mut(id)?;
        r.set_start(secs);
        Ok(r.start)
    }

    pub fn edit_end(&mut self, id: &RecordId, secs: f64) -> Result<f64> {
        let r = self.get_mut(id)?;
        r.set_end(secs);
        Ok(r.end)
    }

    /// Applies a typed timestamp, or rejects it without touching the record.
    pub fn edit_time_text(&mut self, id: &RecordId, bound: Bound, text: &str) -> Result<TimeEdit> {
        let current = {
            let r = self.get(id)?;
            match bound {
                Bound::Start => r.start,
                Bound::End => r.end,
            }
        };

        let Some(v) = time::parse_time(text) else {
            tracing::warn!(input = text, "timestamp should look like 00:00:00.000");
            return Ok(TimeEdit::Rejected {
                revert_to: time::format_time(current),
            });
        };

        let applied = match bound {
            Bound::Start => self.edit_start(id, v)?,
            Bound::End => self.edit_end(id, v)?,
        };
        Ok(TimeEdit::Applied(applied))
    }

    pub fn edit_chinese(&mut self, id: &RecordId, text: &str) -> Result<()> {
        self.get_mut(id)?.content.chinese = text.to_string();
        Ok(())
    }

    pub fn edit_ja(&mut self, id: &RecordId, text: &str) -> Result<()> {
        self.get_mut(id)?.content.first_unit_mut().ja = text.to_string();
        Ok(())
    }

    pub fn edit_romaji(&mut self, id: &RecordId, text: &str) -> Result<()> {
        self.get_mut(id)?.content.first_unit_mut().romaji = text.to_string();
        Ok(())
    }

    /// Writes one record to the store: an update when persisted, a create otherwise.
    pub fn save(&mut self, id: &RecordId) -> Result<()> {
        let r = self.get(id)?.clone();
        match &r.id {
            RecordId::Persisted(row_id) => {
                let input = UpdateInput {
                    id: row_id.clone(),
                    start_time: Some(time::format_time(r.start)),
                    end_time: Some(time::format_time(r.end)),
                    content: Some(r.content.to_value()),
                };
                self.sync(
                    |store| match store.update(input)? {
                        Some(_) => Ok(()),
                        None => Err(anyhow!("subtitle {row_id} no longer exists")),
                    },
                    "update",
                )
            }
            RecordId::Pending(_) => {
                let input = create_input(&self.project_id, &r);
                self.sync(|store| store.create(input).map(|_| ()), "create")
            }
        }
    }

    pub fn delete(&mut self, id: &RecordId) -> Result<()> {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        if self.records.len() == before {
            return Err(anyhow!("no subtitle with id {id}"));
        }

        match id {
            RecordId::Persisted(row_id) => {
                let input = DeleteInput { id: row_id.clone() };
                self.sync(|store| store.delete(input).map(|_| ()), "delete")
            }
            RecordId::Pending(_) => Ok(()),
        }
    }

    /// Replaces the local records with the contents of an `.srt` or `.json` file.
    pub fn import(&mut self, path: &Path, forced: Option<Format>) -> Result<usize> {
        let fmt = match forced {
            Some(f) => f,
            None => Format::from_path(path)?,
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        self.import_text(fmt, &raw)
    }

    pub fn import_text(&mut self, fmt: Format, raw: &str) -> Result<usize> {
        let records = formats::parse_any(raw, fmt)?;
        let n = records.len();
        self.records = records;
        tracing::info!(count = n, ?fmt, "imported subtitles");
        Ok(n)
    }

    /// Makes the store hold exactly the local records for this project, then reloads.
    ///
    /// Every stored row of the project is deleted and every local record is
    /// created again, whatever its id, so a re-import replaces the old cues and
    /// records carrying another project's ids land in this one.
    pub fn replace_stored(&mut self) -> Result<usize> {
        let inputs: Vec<CreateInput> = self
            .records
            .iter()
            .map(|r| create_input(&self.project_id, r))
            .collect();
        let n = inputs.len();
        let list = ListInput {
            project_id: self.project_id.clone(),
            ..Default::default()
        };

        self.sync(
            |store| {
                let stale = store.list(&list)?;
                tracing::debug!(removed = stale.len(), created = inputs.len(), "replacing stored rows");
                for row in stale {
                    store.delete(DeleteInput { id: row.id })?;
                }
                for input in inputs {
                    store.create(input)?;
                }
                Ok(())
            },
            "replace",
        )?;
        Ok(n)
    }

    pub fn export(&self, fmt: Format, json_pretty: bool) -> Result<String> {
        formats::render_any(&self.records, fmt, json_pretty)
    }

    fn sync(&mut self, call: impl FnOnce(&mut S) -> Result<()>, op: &'static str) -> Result<()> {
        if let Err(e) = call(&mut self.store) {
            tracing::warn!(op, error = %e, "store call failed; local state kept");
            return Err(e.context(format!("store {op} failed")));
        }
        self.refresh()
    }

    fn get(&self, id: &RecordId) -> Result<&SubtitleRecord> {
        self.records
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| anyhow!("no subtitle with id {id}"))
    }

    fn get_mut(&mut self, id: &RecordId) -> Result<&mut SubtitleRecord> {
        self.records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| anyhow!("no subtitle with id {id}"))
    }
}

fn create_input(project_id: &str, r: &SubtitleRecord) -> CreateInput {
    CreateInput {
        project_id: project_id.to_string(),
        start_time: time::format_time(r.start),
        end_time: time::format_time(r.end),
        content: r.content.to_value(),
    }
}

pub fn record_from_row(row: &SubtitleRow) -> SubtitleRecord {
    let start = time::parse_time(&row.start_time).unwrap_or_else(|| {
        tracing::warn!(id = row.id.as_str(), value = row.start_time.as_str(), "bad stored start time");
        0.0
    });
    let end = time::parse_time(&row.end_time).unwrap_or_else(|| {
        tracing::warn!(id = row.id.as_str(), value = row.end_time.as_str(), "bad stored end time");
        start
    });

    SubtitleRecord {
        id: RecordId::Persisted(row.id.clone()),
        start,
        end,
        content: Content::from_value(&row.content),
    }
}
