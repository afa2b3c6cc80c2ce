// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Note tool: CRUD and search over a file-backed note store.
//!
//! Each note is one Markdown file under `<state root>/notes/` with a
//! YAML-ish front-matter header carrying id, title, type, tags, and
//! timestamps.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use mnemon_core::MnemonError;

use crate::tool::{ParamKind, Parameter, Tool};

const NOTE_TYPES: &[&str] = &["blocker", "action", "conclusion", "note"];

/// A parsed note record.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub note_type: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
}

impl Note {
    fn render(&self) -> String {
        format!(
            "---\nid: {}\ntitle: {}\ntype: {}\ntags: [{}]\ncreated_at: {}\nupdated_at: {}\n---\n{}",
            self.id,
            self.title,
            self.note_type,
            self.tags.join(", "),
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
            self.body
        )
    }

    fn parse(raw: &str) -> Option<Note> {
        let rest = raw.strip_prefix("---\n")?;
        let (header, body) = rest.split_once("\n---\n")?;
        let mut id = None;
        let mut title = None;
        let mut note_type = None;
        let mut tags = Vec::new();
        let mut created_at = None;
        let mut updated_at = None;
        for line in header.lines() {
            let (key, value) = line.split_once(':')?;
            let value = value.trim();
            match key.trim() {
                "id" => id = Some(value.to_string()),
                "title" => title = Some(value.to_string()),
                "type" => note_type = Some(value.to_string()),
                "tags" => {
                    tags = value
                        .trim_start_matches('[')
                        .trim_end_matches(']')
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect();
                }
                "created_at" => {
                    created_at = DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc));
                }
                "updated_at" => {
                    updated_at = DateTime::parse_from_rfc3339(value)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc));
                }
                _ => {}
            }
        }
        Some(Note {
            id: id?,
            title: title?,
            note_type: note_type.unwrap_or_else(|| "note".into()),
            tags,
            created_at: created_at?,
            updated_at: updated_at?,
            body: body.to_string(),
        })
    }
}

/// File-backed note store plus its tool surface.
pub struct NoteTool {
    dir: PathBuf,
}

impl NoteTool {
    pub fn new(state_root: &Path) -> Self {
        Self {
            dir: state_root.join("notes"),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.md", id.replace(['/', '\\'], "_")))
    }

    async fn load_all(&self) -> Result<Vec<Note>, MnemonError> {
        let mut notes = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(notes),
            Err(e) => return Err(MnemonError::storage(e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(MnemonError::storage)?
        {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let raw = tokio::fs::read_to_string(entry.path())
                .await
                .map_err(MnemonError::storage)?;
            if let Some(note) = Note::parse(&raw) {
                notes.push(note);
            }
        }
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn save(&self, note: &Note) -> Result<(), MnemonError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(MnemonError::storage)?;
        tokio::fs::write(self.path_for(&note.id), note.render())
            .await
            .map_err(MnemonError::storage)
    }

    async fn create(
        &self,
        title: &str,
        note_type: &str,
        tags: Vec<String>,
        body: &str,
    ) -> Result<Note, MnemonError> {
        if !NOTE_TYPES.contains(&note_type) {
            return Err(MnemonError::Tool(format!(
                "note type must be one of {}",
                NOTE_TYPES.join(", ")
            )));
        }
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            note_type: note_type.to_string(),
            tags,
            created_at: now,
            updated_at: now,
            body: body.to_string(),
        };
        self.save(&note).await?;
        Ok(note)
    }
}

#[async_trait]
impl Tool for NoteTool {
    fn name(&self) -> &str {
        "note"
    }

    fn description(&self) -> &str {
        "Creates, reads, updates, deletes, and searches persistent notes."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::required(
                "action",
                ParamKind::String,
                "one of create, read, update, delete, search, list",
            ),
            Parameter::optional("id", ParamKind::String, Value::from(""), "note id"),
            Parameter::optional("title", ParamKind::String, Value::from(""), "note title"),
            Parameter::optional(
                "type",
                ParamKind::String,
                Value::from("note"),
                "blocker, action, conclusion, or note",
            ),
            Parameter::optional("tags", ParamKind::String, Value::from(""), "comma-separated tags"),
            Parameter::optional("body", ParamKind::String, Value::from(""), "markdown body"),
            Parameter::optional("query", ParamKind::String, Value::from(""), "search text"),
        ]
    }

    async fn run(&self, params: serde_json::Map<String, Value>) -> Result<String, MnemonError> {
        let get = |key: &str| params.get(key).and_then(Value::as_str).unwrap_or("");
        match get("action") {
            "create" => {
                let tags: Vec<String> = get("tags")
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                let note = self
                    .create(get("title"), get("type"), tags, get("body"))
                    .await?;
                Ok(format!("created note {} ({})", note.id, note.title))
            }
            "read" => {
                let raw = tokio::fs::read_to_string(self.path_for(get("id")))
                    .await
                    .map_err(|_| MnemonError::Tool(format!("no note with id {:?}", get("id"))))?;
                Ok(raw)
            }
            "update" => {
                let path = self.path_for(get("id"));
                let raw = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|_| MnemonError::Tool(format!("no note with id {:?}", get("id"))))?;
                let mut note = Note::parse(&raw)
                    .ok_or_else(|| MnemonError::Tool("note file is corrupt".into()))?;
                if !get("title").is_empty() {
                    note.title = get("title").to_string();
                }
                if !get("body").is_empty() {
                    note.body = get("body").to_string();
                }
                note.updated_at = Utc::now();
                self.save(&note).await?;
                Ok(format!("updated note {}", note.id))
            }
            "delete" => {
                tokio::fs::remove_file(self.path_for(get("id")))
                    .await
                    .map_err(|_| MnemonError::Tool(format!("no note with id {:?}", get("id"))))?;
                Ok(format!("deleted note {}", get("id")))
            }
            "search" => {
                let query = get("query").to_lowercase();
                let notes = self.load_all().await?;
                let hits: Vec<String> = notes
                    .iter()
                    .filter(|n| {
                        n.title.to_lowercase().contains(&query)
                            || n.body.to_lowercase().contains(&query)
                            || n.tags.iter().any(|t| t.to_lowercase().contains(&query))
                    })
                    .map(|n| format!("{} [{}] {}", n.id, n.note_type, n.title))
                    .collect();
                if hits.is_empty() {
                    Ok("no matching notes".into())
                } else {
                    Ok(hits.join("\n"))
                }
            }
            "list" => {
                let notes = self.load_all().await?;
                if notes.is_empty() {
                    return Ok("no notes".into());
                }
                Ok(notes
                    .iter()
                    .map(|n| format!("{} [{}] {}", n.id, n.note_type, n.title))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            other => Err(MnemonError::Tool(format!("unknown note action {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> serde_json::Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[tokio::test]
    async fn create_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let tool = NoteTool::new(dir.path());
        let out = tool
            .run(params(&[
                ("action", "create"),
                ("title", "deploy blocked"),
                ("type", "blocker"),
                ("tags", "deploy, ci"),
                ("body", "the pipeline is red"),
            ]))
            .await
            .unwrap();
        let id = out.split_whitespace().nth(2).unwrap();

        let raw = tool
            .run(params(&[("action", "read"), ("id", id)]))
            .await
            .unwrap();
        assert!(raw.starts_with("---\n"));
        assert!(raw.contains("type: blocker"));
        assert!(raw.contains("the pipeline is red"));

        let parsed = Note::parse(&raw).unwrap();
        assert_eq!(parsed.tags, vec!["deploy", "ci"]);
    }

    #[tokio::test]
    async fn search_matches_title_body_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let tool = NoteTool::new(dir.path());
        tool.run(params(&[
            ("action", "create"),
            ("title", "retro summary"),
            ("type", "conclusion"),
            ("body", "we shipped the parser"),
        ]))
        .await
        .unwrap();

        let hits = tool
            .run(params(&[("action", "search"), ("query", "parser")]))
            .await
            .unwrap();
        assert!(hits.contains("retro summary"));

        let none = tool
            .run(params(&[("action", "search"), ("query", "unrelated")]))
            .await
            .unwrap();
        assert_eq!(none, "no matching notes");
    }

    #[tokio::test]
    async fn invalid_type_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = NoteTool::new(dir.path());
        let err = tool
            .run(params(&[
                ("action", "create"),
                ("title", "x"),
                ("type", "rant"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, MnemonError::Tool(_)));
    }

    #[tokio::test]
    async fn update_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let tool = NoteTool::new(dir.path());
        let out = tool
            .run(params(&[
                ("action", "create"),
                ("title", "draft"),
                ("type", "note"),
                ("body", "v1"),
            ]))
            .await
            .unwrap();
        let id = out.split_whitespace().nth(2).unwrap().to_string();

        tool.run(params(&[("action", "update"), ("id", &id), ("body", "v2")]))
            .await
            .unwrap();
        let raw = tool
            .run(params(&[("action", "read"), ("id", &id)]))
            .await
            .unwrap();
        assert!(raw.contains("v2"));

        tool.run(params(&[("action", "delete"), ("id", &id)]))
            .await
            .unwrap();
        assert!(
            tool.run(params(&[("action", "read"), ("id", &id)]))
                .await
                .is_err()
        );
    }
}
