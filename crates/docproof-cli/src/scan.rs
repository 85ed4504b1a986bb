//! # Scan Input
//!
//! Shared arguments for commands that read a document scan from disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use docproof_core::DocumentRecord;
use docproof_document::{parse_with, CategoryHint, ParseOptions, RawScan};

/// How to interpret the scan file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScanFormat {
    /// Pick from the file extension: `.json` chip, `.bin`/`.qr` Aadhaar,
    /// anything else MRZ text.
    #[default]
    Auto,
    Mrz,
    Chip,
    Aadhaar,
}

/// What the operator says was scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CategoryArg {
    #[default]
    Auto,
    Passport,
    IdCard,
    Aadhaar,
}

impl From<CategoryArg> for CategoryHint {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Auto => Self::Auto,
            CategoryArg::Passport => Self::Passport,
            CategoryArg::IdCard => Self::IdCard,
            CategoryArg::Aadhaar => Self::Aadhaar,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Scan file: MRZ text, chip JSON or Aadhaar QR bytes.
    pub scan: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: ScanFormat,

    #[arg(long, value_enum, default_value_t)]
    pub category: CategoryArg,

    /// Reject bad check digits while parsing.
    #[arg(long)]
    pub strict: bool,
}

impl ScanArgs {
    pub fn load(&self) -> anyhow::Result<DocumentRecord> {
        let raw = read_scan(&self.scan, self.format)?;
        let options = if self.strict {
            ParseOptions::strict()
        } else {
            ParseOptions::default()
        };
        parse_with(&raw, self.category.into(), options)
            .with_context(|| format!("parsing {}", self.scan.display()))
    }
}

pub fn read_scan(path: &Path, format: ScanFormat) -> anyhow::Result<RawScan> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let format = match format {
        ScanFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ScanFormat::Chip,
            Some("bin" | "qr") => ScanFormat::Aadhaar,
            _ => ScanFormat::Mrz,
        },
        other => other,
    };
    Ok(match format {
        ScanFormat::Chip => RawScan::Chip(bytes),
        ScanFormat::Aadhaar => RawScan::Aadhaar(bytes),
        ScanFormat::Mrz | ScanFormat::Auto => RawScan::Mrz(
            String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_format() {
        let dir = tempfile::tempdir().unwrap();
        let mrz = dir.path().join("scan.txt");
        std::fs::write(&mrz, "P<UTO\n").unwrap();
        let chip = dir.path().join("scan.json");
        std::fs::write(&chip, "{}").unwrap();
        let qr = dir.path().join("scan.bin");
        std::fs::write(&qr, [0xffu8, 0x00]).unwrap();

        assert!(matches!(read_scan(&mrz, ScanFormat::Auto).unwrap(), RawScan::Mrz(_)));
        assert!(matches!(read_scan(&chip, ScanFormat::Auto).unwrap(), RawScan::Chip(_)));
        assert!(matches!(read_scan(&qr, ScanFormat::Auto).unwrap(), RawScan::Aadhaar(_)));
        assert!(matches!(read_scan(&chip, ScanFormat::Mrz).unwrap(), RawScan::Mrz(_)));
        assert!(read_scan(&qr, ScanFormat::Mrz).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_scan(Path::new("/nonexistent/scan.txt"), ScanFormat::Auto).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scan.txt"));
    }
}
