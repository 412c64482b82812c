use std::fmt;

use url::Url;

/// Every demo in the gallery.
///
/// Only the rerank, zero-shot and speech demos have a controller; the
/// generation, vision and multimodal demos are listed and routable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DemoId {
    Llama,
    Phi,
    Janus,
    Florence,
    CrossEncoder,
    ZeroShot,
    SpeechT5,
    AcceleratedTts,
}

impl DemoId {
    pub const ALL: [DemoId; 8] = [
        DemoId::Llama,
        DemoId::Phi,
        DemoId::Janus,
        DemoId::Florence,
        DemoId::CrossEncoder,
        DemoId::ZeroShot,
        DemoId::SpeechT5,
        DemoId::AcceleratedTts,
    ];

    /// Route segment of the demo page.
    pub fn slug(self) -> &'static str {
        match self {
            DemoId::Llama => "llama",
            DemoId::Phi => "phi",
            DemoId::Janus => "janus",
            DemoId::Florence => "florence",
            DemoId::CrossEncoder => "cross-encoder",
            DemoId::ZeroShot => "zero-shot",
            DemoId::SpeechT5 => "speecht5",
            DemoId::AcceleratedTts => "tts",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|demo| demo.slug().eq_ignore_ascii_case(slug))
    }
}

impl fmt::Display for DemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    TextGeneration,
    Classification,
    Vision,
    Audio,
    Multimodal,
}

impl Category {
    pub fn friendly_name(self) -> &'static str {
        match self {
            Category::TextGeneration => "Text Generation",
            Category::Classification => "Text Classification",
            Category::Vision => "Computer Vision",
            Category::Audio => "Audio Processing",
            Category::Multimodal => "Multimodal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoEntry {
    pub id: DemoId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub requires_accelerator: bool,
}

impl DemoEntry {
    pub fn new(
        id: DemoId,
        name: &str,
        description: &str,
        category: Category,
        requires_accelerator: bool,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            category,
            requires_accelerator,
        }
    }

    pub fn is_enabled(&self, capabilities: Capabilities) -> bool {
        !self.requires_accelerator || capabilities.accelerator
    }
}

/// Runtime platform capabilities used to gate demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub accelerator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<DemoEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn new(entries: Vec<DemoEntry>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            DemoEntry::new(
                DemoId::Llama,
                "Llama 3.2",
                "Text generation with Llama 3.2 using GPU acceleration",
                Category::TextGeneration,
                true,
            ),
            DemoEntry::new(
                DemoId::Phi,
                "Phi 3.5",
                "Text generation with Phi 3.5 using GPU acceleration",
                Category::TextGeneration,
                true,
            ),
            DemoEntry::new(
                DemoId::Janus,
                "Janus",
                "Multimodal text generation with image creation capabilities",
                Category::Multimodal,
                true,
            ),
            DemoEntry::new(
                DemoId::Florence,
                "Florence 2",
                "Vision model for image understanding and captioning",
                Category::Vision,
                true,
            ),
            DemoEntry::new(
                DemoId::CrossEncoder,
                "Cross Encoder",
                "Text similarity and relevance scoring",
                Category::Classification,
                false,
            ),
            DemoEntry::new(
                DemoId::ZeroShot,
                "Zero-Shot Classification",
                "Classify text without specific training",
                Category::Classification,
                false,
            ),
            DemoEntry::new(
                DemoId::SpeechT5,
                "SpeechT5",
                "Convert text to speech",
                Category::Audio,
                false,
            ),
            DemoEntry::new(
                DemoId::AcceleratedTts,
                "Text-to-Speech (accelerated)",
                "Generate speech from text with GPU acceleration",
                Category::Audio,
                true,
            ),
        ])
    }

    pub fn entries(&self) -> &[DemoEntry] {
        &self.entries
    }

    pub fn get(&self, id: DemoId) -> Option<&DemoEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Entries grouped by category, in order of first appearance.
    pub fn grouped(&self) -> Vec<(Category, Vec<&DemoEntry>)> {
        let mut groups: Vec<(Category, Vec<&DemoEntry>)> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|(category, _)| *category == entry.category) {
                Some((_, members)) => members.push(entry),
                None => groups.push((entry.category, vec![entry])),
            }
        }
        groups
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Demo(DemoId),
    NotFound(String),
}

/// Maps a URL, absolute path or bare segment to a page.
///
/// A demo route is exactly one path segment; a trailing slash is allowed.
pub fn resolve_route(input: &str) -> Route {
    let trimmed = input.trim();
    let url = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => url,
        Ok(_) => return Route::NotFound(trimmed.to_string()),
        Err(_) => match Url::parse("http://localhost/")
            .and_then(|base| base.join(trimmed.trim_start_matches('/')))
        {
            Ok(url) => url,
            Err(_) => return Route::NotFound(trimmed.to_string()),
        },
    };
    let Some(segments) = url.path_segments() else {
        return Route::NotFound(trimmed.to_string());
    };

    let segments: Vec<&str> = segments.filter(|segment| !segment.is_empty()).collect();
    match segments.as_slice() {
        [] => Route::Home,
        [segment] => match DemoId::from_slug(segment) {
            Some(demo) => Route::Demo(demo),
            None => Route::NotFound(segment.to_string()),
        },
        _ => Route::NotFound(url.path().to_string()),
    }
}
