use std::fmt;

/// Speaker embedding key understood by the speech pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpeakerId(String);

impl SpeakerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Looks up a speaker by its display name or its embedding key.
    pub fn lookup(name_or_id: &str) -> Option<Self> {
        let needle = name_or_id.trim();
        SPEAKERS
            .iter()
            .find(|(name, id)| name.eq_ignore_ascii_case(needle) || *id == needle)
            .map(|(_, id)| Self::new(*id))
    }

    pub fn display_name(&self) -> &str {
        SPEAKERS
            .iter()
            .find(|(_, id)| *id == self.0)
            .map_or(self.0.as_str(), |(name, _)| name)
    }
}

impl Default for SpeakerId {
    fn default() -> Self {
        Self::new(SPEAKERS[0].1)
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display name and embedding key for every selectable speaker.
pub const SPEAKERS: &[(&str, &str)] = &[
    ("US female 1", "cmu_us_slt_arctic-wav-arctic_a0001"),
    ("US female 2", "cmu_us_clb_arctic-wav-arctic_a0001"),
    ("US male 1", "cmu_us_bdl_arctic-wav-arctic_a0003"),
    ("US male 2", "cmu_us_rms_arctic-wav-arctic_a0003"),
    ("Canadian male", "cmu_us_jmk_arctic-wav-arctic_a0002"),
    ("Scottish male", "cmu_us_awb_arctic-wav-arctic_b0002"),
    ("Indian male", "cmu_us_ksp_arctic-wav-arctic_a0007"),
];
