//! Per-file-type composition of release artifacts across repository layers.
//!
//! Layers are offered in ascending index order. For each artifact kind the
//! accumulator remembers which repository supplied the current content, so the
//! winning layer can be inspected per kind.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Command,
    Config,
    Marathon,
    Package,
    Options,
    Uninstall,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Command,
        ArtifactKind::Config,
        ArtifactKind::Marathon,
        ArtifactKind::Package,
        ArtifactKind::Options,
        ArtifactKind::Uninstall,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Command => "command.json",
            ArtifactKind::Config => "config.json",
            ArtifactKind::Marathon => "marathon.json",
            ArtifactKind::Package => "package.json",
            ArtifactKind::Options => "mantl.json",
            ArtifactKind::Uninstall => "uninstall.json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where an artifact's winning content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSource {
    pub repository: String,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Layered {
    source: ArtifactSource,
    content: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactOverlay {
    entries: BTreeMap<ArtifactKind, Layered>,
}

impl ArtifactOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a layer's content for `kind`.
    ///
    /// Empty content is ignored. Content replaces the current entry unless the
    /// current entry came from a strictly higher-index layer.
    pub fn offer(&mut self, kind: ArtifactKind, source: ArtifactSource, content: Vec<u8>) -> bool {
        if content.is_empty() {
            return false;
        }
        if let Some(existing) = self.entries.get(&kind) {
            if existing.source.index > source.index {
                return false;
            }
        }
        self.entries.insert(kind, Layered { source, content });
        true
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&[u8]> {
        self.entries.get(&kind).map(|l| l.content.as_slice())
    }

    pub fn source(&self, kind: ArtifactKind) -> Option<&ArtifactSource> {
        self.entries.get(&kind).map(|l| &l.source)
    }

    pub fn sources(&self) -> BTreeMap<ArtifactKind, ArtifactSource> {
        self.entries
            .iter()
            .map(|(kind, layered)| (*kind, layered.source.clone()))
            .collect()
    }

    pub fn into_artifacts(self) -> BTreeMap<ArtifactKind, Vec<u8>> {
        self.entries
            .into_iter()
            .map(|(kind, layered)| (kind, layered.content))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(name: &str, index: u32) -> ArtifactSource {
        ArtifactSource {
            repository: name.to_string(),
            index,
        }
    }

    #[test]
    fn highest_layer_wins_per_kind() {
        let mut overlay = ArtifactOverlay::new();
        overlay.offer(ArtifactKind::Config, src("base", 0), b"base-config".to_vec());
        overlay.offer(ArtifactKind::Marathon, src("base", 0), b"base-app".to_vec());
        overlay.offer(ArtifactKind::Config, src("site", 2), b"site-config".to_vec());

        assert_eq!(overlay.get(ArtifactKind::Config), Some(&b"site-config"[..]));
        assert_eq!(overlay.source(ArtifactKind::Config).unwrap().index, 2);
        assert_eq!(overlay.get(ArtifactKind::Marathon), Some(&b"base-app"[..]));
        assert_eq!(overlay.source(ArtifactKind::Marathon).unwrap().repository, "base");
        assert!(overlay.get(ArtifactKind::Uninstall).is_none());
    }

    #[test]
    fn lower_layer_and_empty_content_do_not_replace() {
        let mut overlay = ArtifactOverlay::new();
        assert!(overlay.offer(ArtifactKind::Options, src("site", 3), b"{}".to_vec()));
        assert!(!overlay.offer(ArtifactKind::Options, src("base", 0), b"[]".to_vec()));
        assert!(!overlay.offer(ArtifactKind::Options, src("late", 4), Vec::new()));
        assert_eq!(overlay.source(ArtifactKind::Options).unwrap().index, 3);
    }

    #[test]
    fn options_use_the_support_marker_file() {
        assert_eq!(ArtifactKind::Options.file_name(), super::super::keys::SUPPORT_MARKER);
        assert_eq!(ArtifactKind::ALL.len(), 6);
    }
}
