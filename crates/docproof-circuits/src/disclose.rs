//! # Disclose Inputs
//!
//! Inputs for the circuit that proves a registered document satisfies the
//! requesting app's disclosure request: membership of the commitment, OFAC
//! non-membership, an age floor, a country deny-list, and selective reveal
//! of identity attributes.
//!
//! Trees are resolved by name through a [`TreeLookup`] supplied by the
//! caller; the generator never reaches into shared state.

use std::collections::HashMap;
use std::ops::Range;

use chrono::NaiveDate;
use docproof_core::{DocumentCategory, DocumentRecord, UnknownTreeError};
use docproof_crypto::commitment::{document_data, signed_digest};
use docproof_crypto::{
    generate_commitment, generate_nullifier, hash_bytes, leaf_hash, pack_bytes, poseidon_hash,
    verify_exclusion, ExclusionProof, LeafSource, MerkleTree, OfacEntry, TreeKind, UserSecret,
    PACKING_CAPACITY_BYTES,
};
use docproof_document::aadhaar;
use docproof_document::MrzFormat;
use serde::{Deserialize, Serialize};

use crate::dsc::push_inclusion;
use crate::encode::{date_digits, find_offset, Signal};
use crate::error::CircuitError;
use crate::inputs::CircuitInputs;
use crate::variant::CircuitVariant;

/// Tree name the commitment tree is looked up under.
pub const COMMITMENT_TREE: &str = "commitment";
/// Tree name the OFAC tree is looked up under.
pub const OFAC_TREE: &str = "ofac";

/// Forbidden-country list capacity.
pub const MAX_FORBIDDEN_COUNTRIES: usize = 40;
/// Longest MRZ (TD1, 3×30).
pub const MAX_MRZ_LEN: usize = 90;

// ---------------------------------------------------------------------------
// Disclosure configuration
// ---------------------------------------------------------------------------

/// What the requesting app asks the holder to prove or reveal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SelfAppConfig {
    /// App scope; binds the scoped nullifier to one app.
    pub scope: String,
    /// App-side user identifier, bound into the proof.
    pub user_id: String,
    #[serde(default)]
    pub disclosures: Disclosures,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Disclosures {
    #[serde(default)]
    pub issuing_state: bool,
    #[serde(default)]
    pub name: bool,
    #[serde(default)]
    pub id_number: bool,
    #[serde(default)]
    pub nationality: bool,
    #[serde(default)]
    pub date_of_birth: bool,
    #[serde(default)]
    pub gender: bool,
    #[serde(default)]
    pub expiry_date: bool,
    #[serde(default)]
    pub minimum_age: Option<u32>,
    /// ISO 3166-1 alpha-3 codes.
    #[serde(default)]
    pub excluded_countries: Vec<String>,
    #[serde(default)]
    pub ofac: bool,
}

/// A revealable identity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    IssuingState,
    Name,
    IdNumber,
    Nationality,
    DateOfBirth,
    Gender,
    ExpiryDate,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Self::IssuingState,
        Self::Name,
        Self::IdNumber,
        Self::Nationality,
        Self::DateOfBirth,
        Self::Gender,
        Self::ExpiryDate,
    ];

    /// Character range of the attribute in the concatenated MRZ.
    fn mrz_range(&self, format: MrzFormat) -> Range<usize> {
        use Attribute::*;
        match (format, self) {
            (MrzFormat::Td3, IssuingState) => 2..5,
            (MrzFormat::Td3, Name) => 5..44,
            (MrzFormat::Td3, IdNumber) => 44..53,
            (MrzFormat::Td3, Nationality) => 54..57,
            (MrzFormat::Td3, DateOfBirth) => 57..63,
            (MrzFormat::Td3, Gender) => 64..65,
            (MrzFormat::Td3, ExpiryDate) => 65..71,

            (MrzFormat::Td2, IssuingState) => 2..5,
            (MrzFormat::Td2, Name) => 5..36,
            (MrzFormat::Td2, IdNumber) => 36..45,
            (MrzFormat::Td2, Nationality) => 46..49,
            (MrzFormat::Td2, DateOfBirth) => 49..55,
            (MrzFormat::Td2, Gender) => 56..57,
            (MrzFormat::Td2, ExpiryDate) => 57..63,

            (MrzFormat::Td1, IssuingState) => 2..5,
            (MrzFormat::Td1, IdNumber) => 5..14,
            (MrzFormat::Td1, DateOfBirth) => 30..36,
            (MrzFormat::Td1, Gender) => 37..38,
            (MrzFormat::Td1, ExpiryDate) => 38..44,
            (MrzFormat::Td1, Nationality) => 45..48,
            (MrzFormat::Td1, Name) => 60..90,
        }
    }

    /// Index of the attribute among the Aadhaar QR fields. Nationality and
    /// expiry are implicit for Aadhaar.
    fn aadhaar_field(&self) -> Option<usize> {
        match self {
            Self::IssuingState => Some(aadhaar::field::STATE),
            Self::Name => Some(aadhaar::field::NAME),
            Self::IdNumber => Some(aadhaar::field::REFERENCE_ID),
            Self::DateOfBirth => Some(aadhaar::field::DATE_OF_BIRTH),
            Self::Gender => Some(aadhaar::field::GENDER),
            Self::Nationality | Self::ExpiryDate => None,
        }
    }
}

impl Disclosures {
    pub fn reveals(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::IssuingState => self.issuing_state,
            Attribute::Name => self.name,
            Attribute::IdNumber => self.id_number,
            Attribute::Nationality => self.nationality,
            Attribute::DateOfBirth => self.date_of_birth,
            Attribute::Gender => self.gender,
            Attribute::ExpiryDate => self.expiry_date,
        }
    }
}

impl SelfAppConfig {
    /// Reject configurations the circuit cannot encode.
    pub fn check(&self) -> Result<(), CircuitError> {
        let d = &self.disclosures;
        if self.scope.is_empty() {
            return Err(CircuitError::InvalidConfig("scope is empty".into()));
        }
        if d.excluded_countries.len() > MAX_FORBIDDEN_COUNTRIES {
            return Err(CircuitError::InvalidConfig(format!(
                "{} excluded countries, at most {MAX_FORBIDDEN_COUNTRIES}",
                d.excluded_countries.len()
            )));
        }
        if let Some(bad) = d
            .excluded_countries
            .iter()
            .find(|c| c.len() != 3 || !c.bytes().all(|b| b.is_ascii_uppercase()))
        {
            return Err(CircuitError::InvalidConfig(format!(
                "excluded country {bad:?} is not an alpha-3 code"
            )));
        }
        if let Some(age) = d.minimum_age.filter(|a| *a > 99) {
            return Err(CircuitError::InvalidConfig(format!("minimum age {age} exceeds 99")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tree lookup
// ---------------------------------------------------------------------------

/// Read-only access to protocol trees by document category and name.
pub trait TreeLookup {
    fn get_tree(&self, category: DocumentCategory, name: &str) -> Result<&MerkleTree, UnknownTreeError>;
}

/// In-memory [`TreeLookup`] over built trees.
#[derive(Default)]
pub struct TreeRegistry {
    trees: HashMap<(DocumentCategory, TreeKind), MerkleTree>,
}

impl TreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tree` for `category` under its kind's name, replacing any
    /// previous tree of that kind.
    pub fn insert(&mut self, category: DocumentCategory, tree: MerkleTree) -> Option<MerkleTree> {
        self.trees.insert((category, tree.kind()), tree)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

impl TreeLookup for TreeRegistry {
    fn get_tree(&self, category: DocumentCategory, name: &str) -> Result<&MerkleTree, UnknownTreeError> {
        let kind: TreeKind = name.parse()?;
        self.trees.get(&(category, kind)).ok_or_else(|| UnknownTreeError {
            name: format!("{category}/{name}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Disclose inputs dated today (UTC).
pub fn generate_disclose_inputs(
    secret: &UserSecret,
    record: &DocumentRecord,
    app: &SelfAppConfig,
    trees: &impl TreeLookup,
) -> Result<CircuitInputs, CircuitError> {
    generate_disclose_inputs_at(secret, record, app, trees, chrono::Utc::now().date_naive())
}

/// Build disclose inputs as of `today`.
///
/// # Errors
///
/// - [`CircuitError::InvalidConfig`] if `app` cannot be encoded.
/// - [`CircuitError::UnknownTree`] if a required tree is not known.
/// - [`CircuitError::Tree`] with `NotFound` if the document was never
///   registered, or `KeyPresent` if the holder is on the OFAC list.
pub fn generate_disclose_inputs_at(
    secret: &UserSecret,
    record: &DocumentRecord,
    app: &SelfAppConfig,
    trees: &impl TreeLookup,
    today: NaiveDate,
) -> Result<CircuitInputs, CircuitError> {
    app.check()?;
    let category = record.category;
    let mut inputs = CircuitInputs::new(CircuitVariant::for_disclose(category));

    // Commitment membership.
    let attestation_id = category.attestation_id();
    let commitment = generate_commitment(secret, record, attestation_id)?;
    let commitment_tree = trees.get_tree(category, COMMITMENT_TREE)?;
    let leaf = leaf_hash(&LeafSource::Commitment(commitment), TreeKind::Commitment)?;
    let proof = commitment_tree.prove_inclusion(&leaf)?;
    push_inclusion(&mut inputs, "commitment_tree", &proof)?;

    let data = document_data(record);
    let mut padded = data.clone();
    if padded.len() > PACKING_CAPACITY_BYTES {
        return Err(CircuitError::InputTooLarge {
            field: "document_data",
            len: padded.len(),
            max: PACKING_CAPACITY_BYTES,
        });
    }
    padded.resize(PACKING_CAPACITY_BYTES, 0);
    let secret_fe = secret.to_field()?;
    inputs
        .set("secret", Signal::field(&secret_fe))
        .set("attestation_id", Signal::number(attestation_id.0))
        .set("document_data", Signal::bytes(&padded))
        .set("document_data_length", Signal::number(data.len() as u64))
        .set("signed_digest", Signal::field(&signed_digest(record)?));

    selector_signals(&mut inputs, record, &data, &app.disclosures)?;
    ofac_signals(&mut inputs, record, app.disclosures.ofac, trees)?;

    // Predicates.
    let d = &app.disclosures;
    let mut countries: Vec<u8> = d.excluded_countries.concat().into_bytes();
    countries.resize(MAX_FORBIDDEN_COUNTRIES * 3, 0);
    inputs
        .set("minimum_age", Signal::number(u64::from(d.minimum_age.unwrap_or(0))))
        .set("forbidden_countries", Signal::bytes(&countries))
        .set("forbidden_countries_packed", Signal::fields(&pack_bytes(&countries)?))
        .set("current_date", Signal::bytes(&date_digits(today)));

    // Binding to the requesting app.
    let scope = hash_bytes(app.scope.as_bytes())?;
    let user = hash_bytes(app.user_id.as_bytes())?;
    inputs
        .set("scope", Signal::field(&scope))
        .set("user_identifier", Signal::field(&user))
        .expect("nullifier", generate_nullifier(secret, record)?)
        .expect("scoped_nullifier", poseidon_hash([secret_fe, scope]))
        .expect("commitment_tree_root", commitment_tree.root());

    tracing::debug!(
        circuit = %inputs.circuit_id,
        ofac = app.disclosures.ofac,
        minimum_age = ?app.disclosures.minimum_age,
        excluded = app.disclosures.excluded_countries.len(),
        "disclose inputs generated"
    );
    Ok(inputs)
}

fn selector_signals(
    inputs: &mut CircuitInputs,
    record: &DocumentRecord,
    data: &[u8],
    disclosures: &Disclosures,
) -> Result<(), CircuitError> {
    if let Some(lines) = record.raw.mrz_lines() {
        let format = MrzFormat::detect(lines)
            .map_err(|e| CircuitError::MissingData(format!("a well-formed MRZ ({e})")))?;
        let mrz = lines.concat();
        let mut selector = vec![0u8; MAX_MRZ_LEN];
        for attribute in Attribute::ALL.into_iter().filter(|a| disclosures.reveals(*a)) {
            selector[attribute.mrz_range(format)].fill(1);
        }
        let offset = find_offset(data, mrz.as_bytes())
            .ok_or_else(|| CircuitError::MissingData("MRZ inside document data".into()))?;
        inputs
            .set("selector", Signal::bits(&selector))
            .set("mrz_offset", Signal::number(offset as u64))
            .set("mrz_length", Signal::number(mrz.len() as u64));
        return Ok(());
    }

    let mut selector = vec![0u8; aadhaar::FIELD_COUNT];
    for index in Attribute::ALL
        .into_iter()
        .filter(|a| disclosures.reveals(*a))
        .filter_map(|a| a.aadhaar_field())
    {
        selector[index] = 1;
    }
    inputs.set("selector", Signal::bits(&selector));
    Ok(())
}

/// OFAC entries screened for `record`: passport number (MRZ documents
/// only) and name with date of birth.
pub fn ofac_entries(record: &DocumentRecord) -> Vec<(&'static str, OfacEntry)> {
    let id = &record.identity;
    let name = OfacEntry::name_and_dob(&id.surname, &id.given_names, id.date_of_birth.as_str());
    match record.category {
        DocumentCategory::Aadhaar => vec![("ofac_name_dob", name)],
        DocumentCategory::Passport | DocumentCategory::IdCard => vec![
            (
                "ofac_passport_number",
                OfacEntry::PassportNumber {
                    number: id.document_number.as_str().to_string(),
                    nationality: id.nationality.clone(),
                },
            ),
            ("ofac_name_dob", name),
        ],
    }
}

fn ofac_signals(
    inputs: &mut CircuitInputs,
    record: &DocumentRecord,
    enabled: bool,
    trees: &impl TreeLookup,
) -> Result<(), CircuitError> {
    inputs.set("ofac_enabled", Signal::number(u64::from(enabled)));
    if !enabled {
        return Ok(());
    }
    let tree = trees.get_tree(record.category, OFAC_TREE)?;
    for (prefix, entry) in ofac_entries(record) {
        let key = leaf_hash(&LeafSource::Ofac(&entry), TreeKind::Ofac)?;
        let proof = tree.prove_exclusion(&key)?;
        push_exclusion(inputs, prefix, &proof)?;
    }
    Ok(())
}

fn push_exclusion(
    inputs: &mut CircuitInputs,
    prefix: &str,
    proof: &ExclusionProof,
) -> Result<(), CircuitError> {
    if !verify_exclusion(proof) {
        return Err(CircuitError::InvalidProof {
            tree: proof.low.tree.to_string(),
        });
    }
    inputs.set(&format!("{prefix}_key"), Signal::field(&proof.key));
    push_inclusion(inputs, &format!("{prefix}_low"), &proof.low)?;
    push_inclusion(inputs, &format!("{prefix}_high"), &proof.high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproof_crypto::{build_tree, FieldElement, MerkleLeaf, TreeError};
    use docproof_document::{parse, CategoryHint, RawScan};

    fn testdata(name: &str) -> Vec<u8> {
        let path = format!("{}/../../testdata/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(&path).unwrap_or_else(|e| panic!("{path}: {e}"))
    }

    fn passport() -> DocumentRecord {
        parse(&RawScan::Chip(testdata("passport_rsa.json")), CategoryHint::Passport).unwrap()
    }

    fn secret() -> UserSecret {
        UserSecret::new(vec![42u8; 32])
    }

    fn ofac_tree(entries: &[OfacEntry]) -> MerkleTree {
        let leaves = entries
            .iter()
            .map(|e| MerkleLeaf::present(leaf_hash(&LeafSource::Ofac(e), TreeKind::Ofac).unwrap()));
        build_tree(TreeKind::Ofac, leaves).unwrap()
    }

    fn registry(record: &DocumentRecord, ofac: &[OfacEntry]) -> TreeRegistry {
        let commitment =
            generate_commitment(&secret(), record, record.category.attestation_id()).unwrap();
        let mut trees = TreeRegistry::new();
        trees.insert(
            record.category,
            build_tree(
                TreeKind::Commitment,
                [FieldElement::from_u64(11), commitment, FieldElement::from_u64(12)]
                    .map(MerkleLeaf::present),
            )
            .unwrap(),
        );
        trees.insert(record.category, ofac_tree(ofac));
        trees
    }

    fn app() -> SelfAppConfig {
        SelfAppConfig {
            scope: "example-app".into(),
            user_id: "user-1".into(),
            disclosures: Disclosures {
                name: true,
                nationality: true,
                minimum_age: Some(18),
                excluded_countries: vec!["PRK".into(), "IRN".into()],
                ofac: true,
                ..Disclosures::default()
            },
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn sanctioned() -> OfacEntry {
        OfacEntry::PassportNumber {
            number: "X1234567".into(),
            nationality: "ZZZ".into(),
        }
    }

    #[test]
    fn passport_disclosure() {
        let record = passport();
        let trees = registry(&record, &[sanctioned()]);
        let inputs = generate_disclose_inputs_at(&secret(), &record, &app(), &trees, today()).unwrap();

        assert_eq!(inputs.circuit_id, "vc_and_disclose");
        let selector = inputs.signal("selector").unwrap().as_array().unwrap();
        let revealed = selector.iter().filter(|b| *b == "1").count();
        // Name (39 characters) and nationality (3) of a TD3 MRZ.
        assert_eq!(revealed, 42);
        assert_eq!(inputs.signal("mrz_offset").unwrap().as_scalar(), Some("5"));
        assert_eq!(inputs.signal("minimum_age").unwrap().as_scalar(), Some("18"));
        assert_eq!(
            inputs.signal("current_date").unwrap().as_array().unwrap(),
            ["2", "6", "1", "0", "1", "6"]
        );
        assert!(inputs.signal("ofac_passport_number_low_siblings").is_some());
        assert!(inputs.signal("ofac_name_dob_high_root").is_some());
        assert_eq!(
            inputs.expected("nullifier"),
            Some(&generate_nullifier(&secret(), &record).unwrap())
        );
        assert!(inputs.expected("scoped_nullifier").is_some());
    }

    #[test]
    fn scoped_nullifier_depends_on_scope() {
        let record = passport();
        let trees = registry(&record, &[sanctioned()]);
        let a = generate_disclose_inputs_at(&secret(), &record, &app(), &trees, today()).unwrap();
        let mut other = app();
        other.scope = "another-app".into();
        let b = generate_disclose_inputs_at(&secret(), &record, &other, &trees, today()).unwrap();
        assert_ne!(a.expected("scoped_nullifier"), b.expected("scoped_nullifier"));
        assert_eq!(a.expected("nullifier"), b.expected("nullifier"));
    }

    #[test]
    fn unregistered_document_is_not_found() {
        let record = passport();
        let trees = registry(&record, &[sanctioned()]);
        let err = generate_disclose_inputs_at(&UserSecret::new(vec![1u8; 32]), &record, &app(), &trees, today())
            .unwrap_err();
        assert!(matches!(err, CircuitError::Tree(TreeError::NotFound(_))));
    }

    #[test]
    fn missing_ofac_tree_is_unknown() {
        let record = passport();
        let mut trees = TreeRegistry::new();
        let commitment =
            generate_commitment(&secret(), &record, record.category.attestation_id()).unwrap();
        trees.insert(
            record.category,
            build_tree(TreeKind::Commitment, [MerkleLeaf::present(commitment)]).unwrap(),
        );
        let err = generate_disclose_inputs_at(&secret(), &record, &app(), &trees, today()).unwrap_err();
        assert_eq!(
            err,
            CircuitError::UnknownTree(UnknownTreeError {
                name: "passport/ofac".into()
            })
        );

        // Without the OFAC check the tree is never requested.
        let mut no_ofac = app();
        no_ofac.disclosures.ofac = false;
        assert!(generate_disclose_inputs_at(&secret(), &record, &no_ofac, &trees, today()).is_ok());
    }

    #[test]
    fn unknown_tree_name() {
        let trees = TreeRegistry::new();
        let err = trees.get_tree(DocumentCategory::Passport, "sanctions").unwrap_err();
        assert_eq!(err.name, "sanctions");
    }

    #[test]
    fn sanctioned_holder_cannot_prove_exclusion() {
        let record = passport();
        let listed = OfacEntry::PassportNumber {
            number: record.identity.document_number.as_str().to_string(),
            nationality: record.identity.nationality.clone(),
        };
        let trees = registry(&record, &[listed, sanctioned()]);
        let err = generate_disclose_inputs_at(&secret(), &record, &app(), &trees, today()).unwrap_err();
        assert!(matches!(err, CircuitError::Tree(TreeError::KeyPresent { .. })));
    }

    #[test]
    fn invalid_configurations() {
        let mut bad = app();
        bad.disclosures.excluded_countries = vec!["US".into()];
        assert!(matches!(bad.check(), Err(CircuitError::InvalidConfig(_))));

        let mut bad = app();
        bad.disclosures.excluded_countries = vec!["AAA".into(); MAX_FORBIDDEN_COUNTRIES + 1];
        assert!(matches!(bad.check(), Err(CircuitError::InvalidConfig(_))));

        let mut bad = app();
        bad.scope.clear();
        assert!(bad.check().is_err());
    }

    #[test]
    fn aadhaar_selector_indexes_fields() {
        let record = parse(&RawScan::Aadhaar(testdata("aadhaar_qr.bin")), CategoryHint::Aadhaar).unwrap();
        let trees = registry(&record, &[sanctioned()]);
        let mut config = app();
        config.disclosures.date_of_birth = true;
        let inputs = generate_disclose_inputs_at(&secret(), &record, &config, &trees, today()).unwrap();

        assert_eq!(inputs.circuit_id, "vc_and_disclose_aadhaar");
        let selector = inputs.signal("selector").unwrap().as_array().unwrap();
        assert_eq!(selector.len(), aadhaar::FIELD_COUNT);
        assert_eq!(selector[aadhaar::field::NAME], "1");
        assert_eq!(selector[aadhaar::field::DATE_OF_BIRTH], "1");
        assert_eq!(selector.iter().filter(|b| *b == "1").count(), 2);
        assert!(inputs.signal("ofac_passport_number_key").is_none());
        assert!(inputs.signal("ofac_name_dob_key").is_some());
    }

    #[test]
    fn config_wire_form() {
        let json = r#"{"scope":"s","userId":"u","disclosures":{"dateOfBirth":true,"minimumAge":21,"excludedCountries":["PRK"]}}"#;
        let config: SelfAppConfig = serde_json::from_str(json).unwrap();
        assert!(config.disclosures.date_of_birth);
        assert_eq!(config.disclosures.minimum_age, Some(21));
        assert!(!config.disclosures.ofac);
        assert!(serde_json::from_str::<SelfAppConfig>(r#"{"scope":"s","userId":"u","extra":1}"#).is_err());
    }
}
