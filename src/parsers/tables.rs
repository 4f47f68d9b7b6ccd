//! Built-in reference vocabularies.
//!
//! Keep these small and boring. Deployment-specific entries belong in the
//! [`Context`](crate::Context) (`countries`, `ports`), which is consulted first.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

// --- Countries ----------------------------------------------------------------

/// `(name, ISO2, ISO3)`.
const COUNTRIES: &[(&str, &str, &str)] = &[
    ("AFGHANISTAN", "AF", "AFG"),
    ("ALBANIA", "AL", "ALB"),
    ("ALGERIA", "DZ", "DZA"),
    ("ARGENTINA", "AR", "ARG"),
    ("AUSTRALIA", "AU", "AUS"),
    ("AUSTRIA", "AT", "AUT"),
    ("BAHRAIN", "BH", "BHR"),
    ("BANGLADESH", "BD", "BGD"),
    ("BELARUS", "BY", "BLR"),
    ("BELGIUM", "BE", "BEL"),
    ("BOSNIA AND HERZEGOVINA", "BA", "BIH"),
    ("BRAZIL", "BR", "BRA"),
    ("BULGARIA", "BG", "BGR"),
    ("CAMBODIA", "KH", "KHM"),
    ("CANADA", "CA", "CAN"),
    ("CHILE", "CL", "CHL"),
    ("CHINA", "CN", "CHN"),
    ("COLOMBIA", "CO", "COL"),
    ("COSTA RICA", "CR", "CRI"),
    ("CROATIA", "HR", "HRV"),
    ("CYPRUS", "CY", "CYP"),
    ("CZECH REPUBLIC", "CZ", "CZE"),
    ("DENMARK", "DK", "DNK"),
    ("DOMINICAN REPUBLIC", "DO", "DOM"),
    ("ECUADOR", "EC", "ECU"),
    ("EGYPT", "EG", "EGY"),
    ("ESTONIA", "EE", "EST"),
    ("ETHIOPIA", "ET", "ETH"),
    ("FINLAND", "FI", "FIN"),
    ("FRANCE", "FR", "FRA"),
    ("GERMANY", "DE", "DEU"),
    ("GHANA", "GH", "GHA"),
    ("GREECE", "GR", "GRC"),
    ("GUATEMALA", "GT", "GTM"),
    ("HONG KONG", "HK", "HKG"),
    ("HUNGARY", "HU", "HUN"),
    ("ICELAND", "IS", "ISL"),
    ("INDIA", "IN", "IND"),
    ("INDONESIA", "ID", "IDN"),
    ("IRELAND", "IE", "IRL"),
    ("ISRAEL", "IL", "ISR"),
    ("ITALY", "IT", "ITA"),
    ("JAPAN", "JP", "JPN"),
    ("JORDAN", "JO", "JOR"),
    ("KAZAKHSTAN", "KZ", "KAZ"),
    ("KENYA", "KE", "KEN"),
    ("KUWAIT", "KW", "KWT"),
    ("LATVIA", "LV", "LVA"),
    ("LEBANON", "LB", "LBN"),
    ("LITHUANIA", "LT", "LTU"),
    ("LUXEMBOURG", "LU", "LUX"),
    ("MALAYSIA", "MY", "MYS"),
    ("MALTA", "MT", "MLT"),
    ("MEXICO", "MX", "MEX"),
    ("MOROCCO", "MA", "MAR"),
    ("NETHERLANDS", "NL", "NLD"),
    ("NEW ZEALAND", "NZ", "NZL"),
    ("NIGERIA", "NG", "NGA"),
    ("NORWAY", "NO", "NOR"),
    ("OMAN", "OM", "OMN"),
    ("PAKISTAN", "PK", "PAK"),
    ("PANAMA", "PA", "PAN"),
    ("PERU", "PE", "PER"),
    ("PHILIPPINES", "PH", "PHL"),
    ("POLAND", "PL", "POL"),
    ("PORTUGAL", "PT", "PRT"),
    ("QATAR", "QA", "QAT"),
    ("ROMANIA", "RO", "ROU"),
    ("SAUDI ARABIA", "SA", "SAU"),
    ("SERBIA", "RS", "SRB"),
    ("SINGAPORE", "SG", "SGP"),
    ("SLOVAKIA", "SK", "SVK"),
    ("SLOVENIA", "SI", "SVN"),
    ("SOUTH AFRICA", "ZA", "ZAF"),
    ("SOUTH KOREA", "KR", "KOR"),
    ("SPAIN", "ES", "ESP"),
    ("SRI LANKA", "LK", "LKA"),
    ("SWEDEN", "SE", "SWE"),
    ("SWITZERLAND", "CH", "CHE"),
    ("TAIWAN", "TW", "TWN"),
    ("THAILAND", "TH", "THA"),
    ("TUNISIA", "TN", "TUN"),
    ("TURKEY", "TR", "TUR"),
    ("UKRAINE", "UA", "UKR"),
    ("UNITED ARAB EMIRATES", "AE", "ARE"),
    ("UNITED KINGDOM", "GB", "GBR"),
    ("UNITED STATES", "US", "USA"),
    ("URUGUAY", "UY", "URY"),
    ("VIETNAM", "VN", "VNM"),
];

/// Common alternative spellings, local names and abbreviations.
static ALIASES: Lazy<HashMap<&'static str, &'static str>> = table! {
    "UNITED STATES OF AMERICA" => "US",
    "US" => "US",
    "U S A" => "US",
    "AMERICA" => "US",
    "UK" => "GB",
    "GREAT BRITAIN" => "GB",
    "ENGLAND" => "GB",
    "SCOTLAND" => "GB",
    "WALES" => "GB",
    "NORTHERN IRELAND" => "GB",
    "DEUTSCHLAND" => "DE",
    "ALLEMAGNE" => "DE",
    "HOLLAND" => "NL",
    "THE NETHERLANDS" => "NL",
    "NEDERLAND" => "NL",
    "OSTERREICH" => "AT",
    "ÖSTERREICH" => "AT",
    "SCHWEIZ" => "CH",
    "SUISSE" => "CH",
    "ESPANA" => "ES",
    "ESPAÑA" => "ES",
    "ITALIA" => "IT",
    "BELGIE" => "BE",
    "BELGIQUE" => "BE",
    "CZECHIA" => "CZ",
    "KOREA" => "KR",
    "REPUBLIC OF KOREA" => "KR",
    "PR CHINA" => "CN",
    "P R CHINA" => "CN",
    "PEOPLES REPUBLIC OF CHINA" => "CN",
    "UAE" => "AE",
    "TURKIYE" => "TR",
    "TÜRKIYE" => "TR",
    "VIET NAM" => "VN",
    "POLSKA" => "PL",
    "SVERIGE" => "SE",
    "DANMARK" => "DK",
    "NORGE" => "NO",
    "SUOMI" => "FI",
};

static BY_NAME: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| COUNTRIES.iter().map(|&(name, iso2, _)| (name, iso2)).collect());
static BY_ISO3: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| COUNTRIES.iter().map(|&(_, iso2, iso3)| (iso3, iso2)).collect());
static ISO2: Lazy<HashSet<&'static str>> = Lazy::new(|| COUNTRIES.iter().map(|&(_, iso2, _)| iso2).collect());

/// Country name, alias, ISO2 or ISO3 code to ISO2. `key` must already be uppercase.
pub(crate) fn country_code(key: &str) -> Option<&'static str> {
    let cleaned: String = key.replace('.', " ").split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }
    let squashed = cleaned.replace(' ', "");
    BY_NAME
        .get(cleaned.as_str())
        .or_else(|| ALIASES.get(cleaned.as_str()))
        .or_else(|| BY_ISO3.get(squashed.as_str()))
        .or_else(|| ALIASES.get(squashed.as_str()))
        .copied()
        .or_else(|| ISO2.get(squashed.as_str()).copied())
}

/// Every country display name, for fuzzy matching.
pub(crate) fn country_names() -> impl Iterator<Item = (&'static str, &'static str)> {
    COUNTRIES.iter().map(|&(name, iso2, _)| (name, iso2)).chain(ALIASES.iter().map(|(&k, &v)| (k, v)))
}

// --- States and provinces -----------------------------------------------------

const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS", "KY", "LA",
    "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR",
    "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV", "WI", "WY", "PR",
];
const CA_PROVINCES: &[&str] = &["AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT"];
const AU_STATES: &[&str] = &["ACT", "NSW", "NT", "QLD", "SA", "TAS", "VIC", "WA"];
const BR_STATES: &[&str] = &[
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR", "PE", "PI", "RJ",
    "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Whether `token` is a state or province code anywhere we tabulate them.
pub(crate) fn is_any_state(token: &str) -> bool {
    [US_STATES, CA_PROVINCES, AU_STATES, BR_STATES].iter().any(|table| table.contains(&token))
}

/// Countries whose addresses carry a state or province.
pub(crate) fn uses_states(iso2: &str) -> bool {
    matches!(iso2, "US" | "CA" | "AU" | "BR" | "MX" | "IN")
}

/// Whether `token` is a state/province code of `iso2`. Mexican and Indian
/// codes are not tabulated; any two or three capital letters pass.
pub(crate) fn is_state(iso2: &str, token: &str) -> bool {
    let table = match iso2 {
        "US" => US_STATES,
        "CA" => CA_PROVINCES,
        "AU" => AU_STATES,
        "BR" => BR_STATES,
        "MX" | "IN" => {
            return (2..=3).contains(&token.len()) && token.chars().all(|c| c.is_ascii_uppercase());
        }
        _ => return false,
    };
    table.contains(&token)
}

/// Country that owns `token` as a state code, when exactly one does.
pub(crate) fn state_country(token: &str) -> Option<&'static str> {
    let owners: Vec<&'static str> = [("US", US_STATES), ("CA", CA_PROVINCES), ("AU", AU_STATES)]
        .into_iter()
        .filter(|(_, table)| table.contains(&token))
        .map(|(iso2, _)| iso2)
        .collect();
    match owners.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

// --- Address vocabulary -------------------------------------------------------

/// Legal-entity markers, uppercase with dots and commas removed.
pub(crate) static LEGAL_MARKERS: Lazy<HashSet<&'static str>> = word_set! {
    "LTD", "LIMITED", "LLC", "LP", "LLP", "INC", "INCORPORATED", "CORP", "CORPORATION", "CO", "COMPANY",
    "GMBH", "AG", "KG", "KGAA", "OHG", "EV", "BV", "NV", "SA", "SAS", "SARL", "SRL", "SPA", "PLC", "PTY",
    "OY", "OYJ", "AB", "AS", "APS", "SL", "SLU", "KFT", "LTDA", "SE", "SRO", "ZOO",
};

/// Whole-word street types, lowercase without a trailing dot.
pub(crate) static STREET_SUFFIXES: Lazy<HashSet<&'static str>> = word_set! {
    "st", "street", "rd", "road", "ave", "av", "avenue", "blvd", "boulevard", "dr", "drive", "ln", "lane",
    "way", "ct", "court", "pl", "place", "pkwy", "parkway", "hwy", "highway", "sq", "square", "ter",
    "terrace", "cres", "crescent", "cir", "circle", "str", "row", "close", "quay", "wharf",
};

/// Fragments that mark a street word when contained in a token ("Hauptstrasse").
pub(crate) const STREET_FRAGMENTS: &[&str] = &[
    "strasse", "straße", "str.", "weg", "gasse", "allee", "platz", "damm", "laan", "straat", "gracht", "kade",
    "dijk", "vej", "gatan", "gade", "vägen", "veien", "rue", "avenida", "calle", "viale", "carrer", "ulica",
];

/// Facility qualifiers that belong in the second address line.
pub(crate) const FACILITY_WORDS: &[&str] = &[
    "c/o", "building", "bldg", "warehouse", "dock", "gate", "hall", "halle", "unit", "floor", "suite", "ste",
    "tor", "lager", "terminal", "hangar", "door", "rampe",
];

// --- Ports --------------------------------------------------------------------

/// `(name, UN/LOCODE, ISO2)`.
pub(crate) const PORTS: &[(&str, &str, &str)] = &[
    ("Hamburg", "DEHAM", "DE"),
    ("Bremerhaven", "DEBRV", "DE"),
    ("Frankfurt am Main", "DEFRA", "DE"),
    ("Munich", "DEMUC", "DE"),
    ("Rotterdam", "NLRTM", "NL"),
    ("Amsterdam", "NLAMS", "NL"),
    ("Antwerp", "BEANR", "BE"),
    ("Brussels", "BEBRU", "BE"),
    ("London", "GBLON", "GB"),
    ("Felixstowe", "GBFXT", "GB"),
    ("Liverpool", "GBLIV", "GB"),
    ("Southampton", "GBSOU", "GB"),
    ("Paris", "FRPAR", "FR"),
    ("Le Havre", "FRLEH", "FR"),
    ("Graz", "ATGRZ", "AT"),
    ("Vienna", "ATVIE", "AT"),
    ("Basel", "CHBSL", "CH"),
    ("Zurich", "CHZRH", "CH"),
    ("Milan", "ITMIL", "IT"),
    ("Genoa", "ITGOA", "IT"),
    ("Madrid", "ESMAD", "ES"),
    ("Barcelona", "ESBCN", "ES"),
    ("Valencia", "ESVLC", "ES"),
    ("Istanbul", "TRIST", "TR"),
    ("New York", "USNYC", "US"),
    ("Los Angeles", "USLAX", "US"),
    ("Chicago", "USCHI", "US"),
    ("Miami", "USMIA", "US"),
    ("Savannah", "USSAV", "US"),
    ("Toronto", "CATOR", "CA"),
    ("Vancouver", "CAVAN", "CA"),
    ("Santos", "BRSSZ", "BR"),
    ("Mexico City", "MXMEX", "MX"),
    ("Shanghai", "CNSHA", "CN"),
    ("Shenzhen", "CNSZX", "CN"),
    ("Ningbo", "CNNGB", "CN"),
    ("Hong Kong", "HKHKG", "HK"),
    ("Singapore", "SGSIN", "SG"),
    ("Tokyo", "JPTYO", "JP"),
    ("Busan", "KRPUS", "KR"),
    ("Dubai", "AEDXB", "AE"),
    ("Jebel Ali", "AEJEA", "AE"),
    ("Nhava Sheva", "INNSA", "IN"),
    ("Mumbai", "INBOM", "IN"),
    ("Sydney", "AUSYD", "AU"),
    ("Melbourne", "AUMEL", "AU"),
];
