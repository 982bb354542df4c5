use std::path::Path;

use anyhow::{bail, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::dna::BASES_PER_WORD;
use crate::errors::PipelineError;
use crate::layout::BarcodeLayout;

/// The settings file as written by the user. Keys starting with `_` are comments and
/// are ignored along with any other unknown key.
#[derive(Deserialize, Debug)]
struct SettingsFile {
    barcode_format: Option<String>,
    barcodes: Option<IndexMap<String, String>>,
}

/// Maps each sample name to the barcode its reads carry. Iteration order, and so the order
/// in which barcodes are matched and samples are reported, is the order of the settings
/// file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleTable {
    samples: IndexMap<String, String>,
}

impl SampleTable {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.samples.iter().map(|(s, b)| (s.as_str(), b.as_str()))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The first sample whose barcode is exactly (and case-sensitively) `barcode`.
    pub fn find(&self, barcode: &str) -> Option<&str> {
        self.iter().find(|(_, b)| *b == barcode).map(|(s, _)| s)
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub layout: BarcodeLayout,
    pub samples: SampleTable,
}

fn config_err(source: &str, reason: impl Into<String>) -> anyhow::Error {
    PipelineError::Configuration {
        file: source.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Settings {
    /// Reads and validates a JSON settings file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data =
            std::fs::read_to_string(path).map_err(|e| PipelineError::io("reading", path, e))?;
        Self::from_json(&data, &path.display().to_string())
    }

    /// Parses and validates settings from JSON text. `source` names where the text came
    /// from, for error messages.
    pub fn from_json(data: &str, source: &str) -> Result<Self> {
        let file: SettingsFile =
            serde_json::from_str(data).map_err(|e| config_err(source, e.to_string()))?;

        let Some(format) = file.barcode_format else {
            bail!(config_err(source, "required key `barcode_format` not found"));
        };
        let Some(barcodes) = file.barcodes else {
            bail!(config_err(source, "required key `barcodes` not found"));
        };

        Self::new(&format, barcodes, source)
    }

    /// Validates a layout descriptor and a sample table against each other.
    pub fn new(format: &str, barcodes: IndexMap<String, String>, source: &str) -> Result<Self> {
        let layout = BarcodeLayout::new(format);

        if layout.barcode_length() == 0 {
            bail!(config_err(
                source,
                format!("`barcode_format` `{format}` has no barcode positions")
            ));
        }
        if layout.umi_length() > BASES_PER_WORD {
            bail!(config_err(
                source,
                format!(
                    "`barcode_format` has {} UMI positions, at most {BASES_PER_WORD} are supported",
                    layout.umi_length()
                )
            ));
        }
        if barcodes.is_empty() {
            bail!(config_err(source, "`barcodes` must contain at least one sample"));
        }

        for (sample, barcode) in barcodes.iter() {
            if let Some(c) = barcode
                .chars()
                .find(|c| !matches!(c.to_ascii_uppercase(), 'A' | 'C' | 'G' | 'T'))
            {
                bail!(config_err(
                    source,
                    format!("barcode of `{sample}` can only contain A, C, G or T, not `{c}`")
                ));
            }
            if barcode.len() != layout.barcode_length() {
                bail!(config_err(
                    source,
                    format!(
                        "barcode `{barcode}` of `{sample}` has length {}, but `barcode_format` has {} barcode positions",
                        barcode.len(),
                        layout.barcode_length()
                    )
                ));
            }
        }

        // reads are matched case-sensitively, and sequencers write upper case bases
        let barcodes: IndexMap<String, String> = barcodes
            .into_iter()
            .map(|(sample, barcode)| {
                if barcode.bytes().any(|b| b.is_ascii_lowercase()) {
                    warn!("barcode {barcode} of `{sample}` is matched as upper case");
                }
                let barcode = barcode.to_ascii_uppercase();
                (sample, barcode)
            })
            .collect();

        let samples = SampleTable { samples: barcodes };
        for (sample, barcode) in samples.iter() {
            let first = samples.find(barcode).unwrap_or(sample);
            if first != sample {
                warn!("`{sample}` shares barcode {barcode} with `{first}`, and will receive no reads");
            }
        }

        Ok(Settings { layout, samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(json: &str) -> Result<Settings> {
        Settings::from_json(json, "settings.json")
    }

    fn reason(json: &str) -> String {
        match parse(json).unwrap_err().downcast::<PipelineError>().unwrap() {
            PipelineError::Configuration { file, reason } => {
                assert_eq!(file, "settings.json");
                reason
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn valid() {
        let settings = parse(indoc! {r#"
            {
                "_comment": "comments are ignored",
                "barcode_format": "BBBNNNNBB",
                "barcodes": {
                    "sample 2": "GCGAT",
                    "sample 1": "ACCTA"
                }
            }
        "#})
        .unwrap();

        assert_eq!(settings.layout.barcode_length(), 5);
        assert_eq!(settings.layout.umi_length(), 4);
        assert_eq!(settings.samples.names().collect::<Vec<_>>(), ["sample 2", "sample 1"]);
        assert_eq!(settings.samples.find("ACCTA"), Some("sample 1"));
        assert_eq!(settings.samples.find("accta"), None);
        assert_eq!(settings.samples.find("TTTTT"), None);
    }

    #[test]
    fn missing_keys() {
        assert!(reason(r#"{"barcodes": {"a": "AC"}}"#).contains("barcode_format"));
        assert!(reason(r#"{"barcode_format": "BB"}"#).contains("barcodes"));
    }

    #[test]
    fn wrong_types() {
        reason(r#"{"barcode_format": 5, "barcodes": {"a": "AC"}}"#);
        reason(r#"{"barcode_format": "BB", "barcodes": ["AC", "GT"]}"#);
        reason("not json at all");
    }

    #[test]
    fn barcode_characters() {
        assert!(reason(r#"{"barcode_format": "BB", "barcodes": {"a": "AX"}}"#).contains("`X`"));
    }

    #[test]
    fn lower_case_barcodes_match_upper_case_reads() {
        let settings = parse(r#"{"barcode_format": "BB", "barcodes": {"a": "ac", "b": "gT"}}"#).unwrap();
        assert_eq!(settings.samples.find("AC"), Some("a"));
        assert_eq!(settings.samples.find("GT"), Some("b"));
        assert_eq!(settings.samples.find("ac"), None);

        // once upper cased, `AC` and `ac` are the same barcode
        let settings = parse(r#"{"barcode_format": "BB", "barcodes": {"x": "ac", "y": "AC"}}"#).unwrap();
        assert_eq!(settings.samples.find("AC"), Some("x"));
    }

    #[test]
    fn barcode_lengths() {
        let r = reason(r#"{"barcode_format": "BBNN", "barcodes": {"a": "AC", "b": "ACG"}}"#);
        assert!(r.contains("`ACG`"), "{r}");
        assert!(r.contains("2 barcode positions"), "{r}");
    }

    #[test]
    fn layout_limits() {
        assert!(reason(r#"{"barcode_format": "NNNN", "barcodes": {"a": ""}}"#)
            .contains("no barcode positions"));

        let format = format!("B{}", "N".repeat(33));
        let json = format!(r#"{{"barcode_format": "{format}", "barcodes": {{"a": "A"}}}}"#);
        assert!(reason(&json).contains("at most 32"));

        assert!(reason(r#"{"barcode_format": "BB", "barcodes": {}}"#).contains("at least one"));
    }

    #[test]
    fn shared_barcode_first_wins() {
        let settings = parse(r#"{"barcode_format": "BB", "barcodes": {"x": "AC", "y": "AC"}}"#).unwrap();
        assert_eq!(settings.samples.find("AC"), Some("x"));
    }

    #[test]
    fn missing_file() {
        let err = Settings::from_path("/no/such/settings.json").unwrap_err();
        assert!(err.to_string().contains("/no/such/settings.json"));
    }
}
