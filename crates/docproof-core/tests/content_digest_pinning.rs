//! Content hashes must be stable across processes and releases: they are
//! used as lookup keys for previously registered documents. These vectors
//! were computed independently (JCS + SHA-256) and pinned here.

use docproof_core::{
    CanonicalBytes, DocumentCategory, DocumentNumber, DocumentRecord, HolderIdentity, MrzDate,
    RawDocument, Sex,
};

fn icao_specimen() -> DocumentRecord {
    let identity = HolderIdentity {
        document_type: "P".into(),
        issuing_state: "UTO".into(),
        document_number: DocumentNumber::new("L898902C3").unwrap(),
        nationality: "UTO".into(),
        date_of_birth: MrzDate::new("740812").unwrap(),
        date_of_expiry: MrzDate::new("120415").unwrap(),
        sex: Sex::Female,
        surname: "ERIKSSON".into(),
        given_names: "ANNA MARIA".into(),
        optional_data: "ZE184226B".into(),
    };
    let raw = RawDocument::Mrz {
        lines: vec![
            "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<".into(),
            "L898902C36UTO7408122F1204159ZE184226B<<<<<10".into(),
        ],
    };
    DocumentRecord::new(DocumentCategory::Passport, identity, raw, None, None).unwrap()
}

#[test]
fn canonical_form_is_sorted_compact_json() {
    let record = icao_specimen();
    let cb = CanonicalBytes::new(&record.canonical_view()).unwrap();
    let expected = concat!(
        r#"{"category":"passport","identity":{"date_of_birth":"740812","#,
        r#""date_of_expiry":"120415","document_number":"L898902C3","document_type":"P","#,
        r#""given_names":"ANNA MARIA","issuing_state":"UTO","nationality":"UTO","#,
        r#""optional_data":"ZE184226B","sex":"female","surname":"ERIKSSON"},"#,
        r#""raw":{"lines":["P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<","#,
        r#""L898902C36UTO7408122F1204159ZE184226B<<<<<10"],"source":"mrz"}}"#,
    );
    assert_eq!(std::str::from_utf8(cb.as_bytes()).unwrap(), expected);
}

#[test]
fn pinned_content_hash() {
    let record = icao_specimen();
    assert_eq!(
        record.content_hash.to_string(),
        "sha256:ffea97b1aa45a189c2372bf7561344abd5199577534c7a620f7a8e0714ad42f7"
    );
}
