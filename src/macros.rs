/// Compile a literal pattern once and hand out a `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a lazily initialised `HashMap` from `key => value` pairs.
///
/// ```ignore
/// static UNITS: Lazy<HashMap<&'static str, &'static str>> = table! { "cm" => "CMT", "mm" => "MM" };
/// ```
#[macro_export]
macro_rules! table {
    ($($key:expr => $value:expr),* $(,)?) => {
        once_cell::sync::Lazy::new(|| std::collections::HashMap::from([ $(($key, $value)),* ]))
    };
}

/// Build a lazily initialised `HashSet` of string literals.
#[macro_export]
macro_rules! word_set {
    ($($word:expr),* $(,)?) => {
        once_cell::sync::Lazy::new(|| std::collections::HashSet::from([ $($word),* ]))
    };
}
