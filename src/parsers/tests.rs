use super::*;
use crate::Context;

fn dims(raw: &str) -> Vec<Dimensions> {
    parse(ParserKind::Dimension, raw, &Context::default())
        .into_iter()
        .filter_map(|p| match p {
            Parsed::Dimensions(d) => Some(d),
            _ => None,
        })
        .collect()
}

fn lwh(d: &Dimensions) -> (&str, &str, &str) {
    (d.length.as_str(), d.width.as_str(), d.height.as_str())
}

// --- dimensions ---------------------------------------------------------------

#[test]
fn plain_dimensions_have_no_count() {
    let found = dims("120x80x100cm");
    assert_eq!(found.len(), 1);
    assert_eq!(lwh(&found[0]), ("120", "80", "100"));
    assert_eq!(found[0].uom, LengthUom::Cmt);
    assert_eq!(found[0].package_count, None);
    assert_eq!(found[0].extra_text, None);
}

#[test]
fn leading_count_and_restarts() {
    let found = dims("2x 115x140x92cm");
    assert_eq!(found.len(), 1);
    assert_eq!(lwh(&found[0]), ("115", "140", "92"));
    assert_eq!(found[0].package_count.as_deref(), Some("2"));

    let found = dims("2x 115x140x92cm 1x 80x60x50cm");
    let counts: Vec<Option<&str>> = found.iter().map(|d| d.package_count.as_deref()).collect();
    assert_eq!(counts, vec![Some("2"), Some("1")]);
    assert_eq!(lwh(&found[1]), ("80", "60", "50"));
}

#[test]
fn pallets_and_gross_weight() {
    let found = dims("3 pallets - 120x80x100 cm 250kg");
    assert_eq!(found.len(), 1);
    let d = &found[0];
    assert_eq!(lwh(d), ("120", "80", "100"));
    assert_eq!(d.package_count.as_deref(), Some("3"));
    assert_eq!(d.package_type.as_deref(), Some("PLT"));
    assert_eq!(d.gross_weight.as_deref(), Some("250"));
    assert_eq!(d.gross_weight_uom.as_deref(), Some("KGM"));
}

#[test]
fn four_number_groups_lead_with_the_count() {
    let found = dims("3 x 120 x 80 x 100");
    assert_eq!(found.len(), 1);
    assert_eq!(lwh(&found[0]), ("120", "80", "100"));
    assert_eq!(found[0].package_count.as_deref(), Some("3"));

    let found = dims("120x80x100x2 pallets");
    assert_eq!(lwh(&found[0]), ("120", "80", "100"));
    assert_eq!(found[0].package_count.as_deref(), Some("2"));
    assert_eq!(found[0].package_type.as_deref(), Some("PLT"));
}

#[test]
fn metre_decimals_use_points() {
    let found = dims("0,70x0,46x0,50 m");
    assert_eq!(lwh(&found[0]), ("0.70", "0.46", "0.50"));
    assert_eq!(found[0].uom, LengthUom::Mtr);
}

#[test]
fn bracketed_counts() {
    let found = dims("48 X 45 X 12 (2)");
    assert_eq!(lwh(&found[0]), ("48", "45", "12"));
    assert_eq!(found[0].package_count.as_deref(), Some("2"));

    let found = dims("54cm * 54cm * 37cm (2BOX)");
    assert_eq!(lwh(&found[0]), ("54", "54", "37"));
    assert_eq!(found[0].inner_package_count.as_deref(), Some("2"));
    assert_eq!(found[0].inner_package_type.as_deref(), Some("BOX"));
    assert_eq!(found[0].package_count, None);
}

#[test]
fn at_sign_counts() {
    let found = dims("5PLTS 1@80X120X100 4@80X120X90");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].package_count.as_deref(), Some("1"));
    assert_eq!(lwh(&found[1]), ("80", "120", "90"));
    assert_eq!(found[1].package_count.as_deref(), Some("4"));
    assert!(found.iter().all(|d| d.package_type.as_deref() == Some("PLT")));
}

#[test]
fn labelled_dimensions() {
    let found = dims("Length 47 Width 20 Height 20 CM");
    assert_eq!(found.len(), 1);
    assert_eq!(lwh(&found[0]), ("47", "20", "20"));
}

// --- dispatch and flattening ------------------------------------------------------

#[test]
fn unparseable_values_stay_opaque() {
    let ctx = Context::default();
    assert_eq!(parse(ParserKind::Weight, "heavy", &ctx), vec![Parsed::Opaque("heavy".into())]);
    assert_eq!(parse(ParserKind::Dimension, "see packing list", &ctx), vec![Parsed::Opaque("see packing list".into())]);
    assert_eq!(parse(ParserKind::Incoterm, "", &ctx), vec![Parsed::Opaque(String::new())]);
    assert_eq!(parse(ParserKind::Address, "ACME LTD", &ctx), vec![Parsed::Opaque("ACME LTD".into())]);
    assert!(parse(ParserKind::Incoterm, "", &ctx)[0].fields("incoterms").is_empty());
}

fn fields(kind: ParserKind, label: &str, raw: &str) -> Vec<(String, String)> {
    let ctx = Context::default();
    parse(kind, raw, &ctx).iter().flat_map(|p| p.fields(label)).collect()
}

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter().map(|(l, v)| (l.to_string(), v.to_string())).collect()
}

#[test]
fn measure_fields() {
    assert_eq!(
        fields(ParserKind::Weight, "grossWeight", "500 KGS gross"),
        pairs(&[("grossWeight", "500"), ("grossWeightUom", "KGM"), ("grossWeight_1", "gross")])
    );
    assert_eq!(fields(ParserKind::Volume, "volume", "12,5 cbm"), pairs(&[("volume", "12.5"), ("volumeUom", "MTQ")]));
}

#[test]
fn dimension_fields() {
    assert_eq!(
        fields(ParserKind::Dimension, "dimensions", "120x80x100cm"),
        pairs(&[("length", "120"), ("width", "80"), ("height", "100"), ("dimensionsUom", "CMT")])
    );
}

#[test]
fn location_fields_follow_the_label_stem() {
    assert_eq!(
        fields(ParserKind::Location, "originLocationName", "Hamburg, Germany"),
        pairs(&[("originLocationName", "Hamburg"), ("originLocationCode", "DEHAM"), ("originCountryCode", "DE")])
    );
    assert_eq!(
        fields(ParserKind::Location, "portName", "Rotterdam"),
        pairs(&[("portName", "Rotterdam"), ("portCode", "NLRTM"), ("portCountryCode", "NL")])
    );
}

#[test]
fn incoterm_and_temperature_fields() {
    assert_eq!(
        fields(ParserKind::Incoterm, "incoterms", "FCA Graz"),
        pairs(&[("incoterms", "FCA"), ("incotermsLocation", "Graz")])
    );
    assert_eq!(
        fields(ParserKind::Temperature, "temperature", "2-8C"),
        pairs(&[
            ("requiresTemperatureControl", "TRUE"),
            ("requiredMinimum", "2"),
            ("requiredMaximum", "8"),
            ("temperatureUom", "CEL"),
        ])
    );
    assert_eq!(
        fields(ParserKind::Temperature, "temperature", "ambient"),
        pairs(&[("requiresTemperatureControl", "FALSE")])
    );
}

#[test]
fn package_fields_pick_the_type_label() {
    assert_eq!(
        fields(ParserKind::PackageCount, "innerPackageCount", "12 cartons"),
        pairs(&[("innerPackageCount", "12"), ("innerPackageType", "CTN")])
    );
    assert_eq!(
        fields(ParserKind::PackageCount, "packageCount", "3 PLT"),
        pairs(&[("packageCount", "3"), ("packageType", "PLT")])
    );
}

#[test]
fn address_fields_skip_empty_parts() {
    let found = fields(ParserKind::Address, "shipper", "ACME LTD\n12 Harbour Road\nLIVERPOOL L3 4AB\nUNITED KINGDOM");
    assert_eq!(
        found,
        pairs(&[
            ("name", "ACME LTD"),
            ("addressLine1", "12 Harbour Road"),
            ("city", "LIVERPOOL"),
            ("postalCode", "L3 4AB"),
            ("countryCode", "GB"),
        ])
    );
}

mod props {
    use super::*;
    use proptest::prelude::*;

    const KINDS: [ParserKind; 8] = [
        ParserKind::Dimension,
        ParserKind::Address,
        ParserKind::Weight,
        ParserKind::Volume,
        ParserKind::Temperature,
        ParserKind::Incoterm,
        ParserKind::Location,
        ParserKind::PackageCount,
    ];

    proptest! {
        #[test]
        fn every_parser_answers(kind in 0usize..8, raw in "[ -~\n×°]{0,48}") {
            let out = parse(KINDS[kind], &raw, &Context::default());
            prop_assert!(!out.is_empty());
        }

        #[test]
        fn unicode_input_never_panics(kind in 0usize..8, raw in "\\PC{0,32}") {
            let _ = parse(KINDS[kind], &raw, &Context::default());
        }
    }
}
