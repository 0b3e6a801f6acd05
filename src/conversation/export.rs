//! Plain-text transcript export.
//!
//! Section headers and the order of the settings lines are fixed; people
//! read these files side by side.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tracing::info;

use crate::error::{Error, Result};
use crate::persona::PersonaAttributes;

use super::ledger::ConversationLedger;

const HEAVY_RULE: &str = "============================================================";
const LIGHT_RULE: &str = "------------------------------------------------------------";

impl ConversationLedger {
    /// Render the whole conversation as a flat text document stamped with
    /// the current local time.
    pub fn serialize_for_export(
        &self,
        attrs: &PersonaAttributes,
        introduction_text: Option<&str>,
    ) -> String {
        self.serialize_at(attrs, introduction_text, &Local::now())
    }

    /// Same as [`serialize_for_export`](Self::serialize_for_export) with an
    /// explicit timestamp.
    pub fn serialize_at<Tz: TimeZone>(
        &self,
        attrs: &PersonaAttributes,
        introduction_text: Option<&str>,
        generated_at: &DateTime<Tz>,
    ) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut out = String::new();

        out.push_str(HEAVY_RULE);
        out.push('\n');
        out.push_str("RELIGIOUS PERSONA CONVERSATION\n");
        out.push_str(HEAVY_RULE);
        out.push('\n');
        out.push_str(&format!(
            "Downloaded: {}\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));

        out.push_str("PERSONA SETTINGS:\n");
        out.push_str(LIGHT_RULE);
        out.push('\n');
        for (label, value) in settings_lines(attrs) {
            out.push_str(&format!("{}: {}\n", label, value));
        }
        out.push('\n');

        out.push_str("PERSONA INTRODUCTION:\n");
        out.push_str(LIGHT_RULE);
        out.push('\n');
        match introduction_text.filter(|t| !t.trim().is_empty()) {
            Some(text) => out.push_str(text),
            None => out.push_str("N/A"),
        }
        out.push_str("\n\n");

        out.push_str(HEAVY_RULE);
        out.push('\n');
        out.push_str("CONVERSATION TRANSCRIPT:\n");
        out.push_str(HEAVY_RULE);
        out.push_str("\n\n");

        for turn in self.turns() {
            out.push_str(&format!("{}: {}\n\n", turn.role.transcript_label(), turn.text));
        }

        out
    }
}

/// Settings block in its fixed order.
fn settings_lines(attrs: &PersonaAttributes) -> [(&'static str, String); 8] {
    [
        ("Religious Tradition", attrs.tradition.clone()),
        ("Denomination/Movement", attrs.denomination.clone()),
        ("Geographic/Cultural Context", attrs.geographic_context.clone()),
        ("Demographics", attrs.demographics.clone()),
        ("Personality", attrs.personality.clone()),
        ("Knowledge Level", attrs.knowledge_level.to_string()),
        ("Engagement Level", attrs.engagement_level.to_string()),
        ("Attitude towards Religion", attrs.attitude.to_string()),
    ]
}

/// `religious_conversation_YYYYMMDD_HHMMSS.txt`
pub fn export_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("religious_conversation_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// Write an export document into `dir`, creating the directory if needed.
pub fn write_export(dir: &Path, contents: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| Error::IoWrite {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let path = dir.join(export_file_name(&Local::now()));
    fs::write(&path, contents).map_err(|e| Error::IoWrite {
        path: path.clone(),
        source: e,
    })?;

    info!(path = %path.display(), bytes = contents.len(), "Conversation exported");
    Ok(path)
}
