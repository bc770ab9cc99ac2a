//! Transcript path → source media path translation.
//!
//! Transcripts are written under a storage root that mirrors the export they
//! came from. Each [`TranslationRule`] maps one such storage prefix back to the
//! directory holding the original recordings, swapping the `.txt` extension for
//! the media extension of that source.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::scope_path::{self, find_segments};

pub const VOICE_MEMOS_PREFIX: &str = "AppleVoiceMemos";
pub const PHOTOS_PREFIX: &str = "ApplePhotos";

const VOICE_MEMOS_RECORDINGS: &str =
    "Library/Group Containers/group.com.apple.VoiceMemos.shared/Recordings";
const PHOTOS_ORIGINALS: &str = "Pictures/Photos Library.photoslibrary/originals";

const TRANSCRIPT_EXTENSION: &str = ".txt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaLayout {
    /// Media files sit directly under the mirrored directory.
    #[default]
    Flat,
    /// Media files are bucketed into a one-character subfolder named after the
    /// lowercase first character of the file name (Photos library originals).
    ShardedByFirstChar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRule {
    pub storage_prefix: String,
    pub media_extension: String,
    pub media_root: String,
    #[serde(default)]
    pub layout: MediaLayout,
}

impl TranslationRule {
    pub fn new(
        storage_prefix: impl Into<String>,
        media_extension: impl Into<String>,
        media_root: impl Into<String>,
        layout: MediaLayout,
    ) -> Self {
        Self {
            storage_prefix: storage_prefix.into(),
            media_extension: media_extension.into(),
            media_root: media_root.into(),
            layout,
        }
    }

    fn normalized(&self) -> Self {
        Self {
            storage_prefix: scope_path::normalize(&self.storage_prefix)
                .trim_matches('/')
                .to_string(),
            media_extension: self.media_extension.trim_start_matches('.').to_string(),
            media_root: scope_path::normalize(&self.media_root),
            layout: self.layout,
        }
    }
}

pub fn default_rules(home: &str) -> Vec<TranslationRule> {
    let home = scope_path::normalize(home);
    vec![
        TranslationRule::new(
            VOICE_MEMOS_PREFIX,
            "m4a",
            join(&home, VOICE_MEMOS_RECORDINGS),
            MediaLayout::Flat,
        ),
        TranslationRule::new(
            PHOTOS_PREFIX,
            "mov",
            join(&home, PHOTOS_ORIGINALS),
            MediaLayout::ShardedByFirstChar,
        ),
    ]
}

/// Validated, read-only rule table. Built once at startup and shared.
#[derive(Debug, Clone)]
pub struct TranslationTable {
    rules: Vec<TranslationRule>,
}

impl TranslationTable {
    pub fn new(rules: Vec<TranslationRule>) -> Result<Self, AppError> {
        let rules: Vec<TranslationRule> = rules.iter().map(TranslationRule::normalized).collect();

        for rule in &rules {
            if rule.storage_prefix.is_empty() {
                return Err(AppError::Config(
                    "translation rule has an empty storage prefix".to_string(),
                ));
            }
            if rule.media_extension.is_empty() {
                return Err(AppError::Config(format!(
                    "translation rule '{}' has no media extension",
                    rule.storage_prefix
                )));
            }
        }

        for (i, first) in rules.iter().enumerate() {
            for second in &rules[i + 1..] {
                if prefixes_overlap(&first.storage_prefix, &second.storage_prefix) {
                    return Err(AppError::AmbiguousPath {
                        first: first.storage_prefix.clone(),
                        second: second.storage_prefix.clone(),
                    });
                }
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[TranslationRule] {
        &self.rules
    }

    /// Map a transcript path to the media file it was transcribed from.
    ///
    /// `None` means there is no playable media for this transcript: no rule
    /// matches, or the path is not a `.txt` transcript below the prefix.
    pub fn resolve(&self, transcript_path: &str) -> Option<String> {
        let path = scope_path::normalize(transcript_path);
        let (rule, prefix_end) = self.rules.iter().find_map(|rule| {
            find_segments(&path, &rule.storage_prefix).map(|end| (rule, end))
        })?;

        let remainder = path[prefix_end..].trim_start_matches('/');
        let stem = strip_transcript_extension(remainder)?;
        let (subdir, file_stem) = match stem.rfind('/') {
            Some(split) => (&stem[..split], &stem[split + 1..]),
            None => ("", stem),
        };
        if file_stem.is_empty() {
            return None;
        }

        let file_name = format!("{file_stem}.{}", rule.media_extension);
        let mut media_path = rule.media_root.clone();
        if !subdir.is_empty() {
            media_path = join(&media_path, subdir);
        }
        if rule.layout == MediaLayout::ShardedByFirstChar {
            let shard: String = file_name.chars().next()?.to_lowercase().collect();
            media_path = join(&media_path, &shard);
        }
        Some(join(&media_path, &file_name))
    }
}

fn prefixes_overlap(a: &str, b: &str) -> bool {
    a == b || find_segments(a, b).is_some() || find_segments(b, a).is_some()
}

fn strip_transcript_extension(path: &str) -> Option<&str> {
    let split = path.len().checked_sub(TRANSCRIPT_EXTENSION.len())?;
    let extension = path.get(split..)?;
    if extension.eq_ignore_ascii_case(TRANSCRIPT_EXTENSION) {
        Some(&path[..split])
    } else {
        None
    }
}

fn join(base: &str, segment: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{segment}")
    } else {
        format!("{base}/{segment}")
    }
}
