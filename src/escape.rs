//! File classification and per-format escaping of substituted values.

use std::fmt::Write;
use std::path::Path;

/// Escapes a scope value before it is inserted into a generated file.
///
/// Same shape as [`tera::EscapeFn`] so escapers plug straight into the renderer.
pub type Escaper = fn(&str) -> String;

/// Escapers by classification key.
static ESCAPERS: &[(&str, Escaper)] = &[
    ("xml", escape_xml),
    ("java", escape_java),
    ("js", escape_ecmascript),
    ("ts", escape_ecmascript),
    ("html", escape_html),
    ("properties", escape_none),
    // plaintext formats
    ("md", escape_none),
    ("adoc", escape_none),
    ("txt", escape_none),
    ("README", escape_none),
];

/// Used for keys missing from the table; Java string rules suit most source formats.
pub const DEFAULT_ESCAPER: Escaper = escape_java;

/// Classification key of a file name: its extension, or the whole name if it has none.
///
/// `App.java` gives `java`, `README` gives `README`, `.gitignore` gives `gitignore`.
pub fn classify(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => file_name,
    }
}

/// Classification key of a path's final component.
pub fn classify_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    classify(&name).to_string()
}

/// Escaper configured for `key`, or [`DEFAULT_ESCAPER`].
pub fn escaper_for(key: &str) -> Escaper {
    ESCAPERS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, escaper)| *escaper)
        .unwrap_or(DEFAULT_ESCAPER)
}

/// Leaves the value untouched.
pub fn escape_none(value: &str) -> String {
    value.to_string()
}

/// HTML 4 entity names for U+00A0 to U+00FF, indexed from U+00A0.
static LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect",
    "uml", "copy", "ordf", "laquo", "not", "shy", "reg", "macr",
    "deg", "plusmn", "sup2", "sup3", "acute", "micro", "para", "middot",
    "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil",
    "Egrave", "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml",
    "ETH", "Ntilde", "Ograve", "Oacute", "Ocirc", "Otilde", "Ouml", "times",
    "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml", "Yacute", "THORN", "szlig",
    "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig", "ccedil",
    "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml",
    "eth", "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide",
    "oslash", "ugrave", "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

/// Remaining HTML 4 entities (symbols, Greek, special), sorted by character.
static HTML4_ENTITIES: &[(char, &str)] = &[
    ('\u{152}', "OElig"), ('\u{153}', "oelig"), ('\u{160}', "Scaron"), ('\u{161}', "scaron"),
    ('\u{178}', "Yuml"), ('\u{192}', "fnof"), ('\u{2c6}', "circ"), ('\u{2dc}', "tilde"),
    ('\u{391}', "Alpha"), ('\u{392}', "Beta"), ('\u{393}', "Gamma"), ('\u{394}', "Delta"),
    ('\u{395}', "Epsilon"), ('\u{396}', "Zeta"), ('\u{397}', "Eta"), ('\u{398}', "Theta"),
    ('\u{399}', "Iota"), ('\u{39a}', "Kappa"), ('\u{39b}', "Lambda"), ('\u{39c}', "Mu"),
    ('\u{39d}', "Nu"), ('\u{39e}', "Xi"), ('\u{39f}', "Omicron"), ('\u{3a0}', "Pi"),
    ('\u{3a1}', "Rho"), ('\u{3a3}', "Sigma"), ('\u{3a4}', "Tau"), ('\u{3a5}', "Upsilon"),
    ('\u{3a6}', "Phi"), ('\u{3a7}', "Chi"), ('\u{3a8}', "Psi"), ('\u{3a9}', "Omega"),
    ('\u{3b1}', "alpha"), ('\u{3b2}', "beta"), ('\u{3b3}', "gamma"), ('\u{3b4}', "delta"),
    ('\u{3b5}', "epsilon"), ('\u{3b6}', "zeta"), ('\u{3b7}', "eta"), ('\u{3b8}', "theta"),
    ('\u{3b9}', "iota"), ('\u{3ba}', "kappa"), ('\u{3bb}', "lambda"), ('\u{3bc}', "mu"),
    ('\u{3bd}', "nu"), ('\u{3be}', "xi"), ('\u{3bf}', "omicron"), ('\u{3c0}', "pi"),
    ('\u{3c1}', "rho"), ('\u{3c2}', "sigmaf"), ('\u{3c3}', "sigma"), ('\u{3c4}', "tau"),
    ('\u{3c5}', "upsilon"), ('\u{3c6}', "phi"), ('\u{3c7}', "chi"), ('\u{3c8}', "psi"),
    ('\u{3c9}', "omega"), ('\u{3d1}', "thetasym"), ('\u{3d2}', "upsih"), ('\u{3d6}', "piv"),
    ('\u{2002}', "ensp"), ('\u{2003}', "emsp"), ('\u{2009}', "thinsp"), ('\u{200c}', "zwnj"),
    ('\u{200d}', "zwj"), ('\u{200e}', "lrm"), ('\u{200f}', "rlm"), ('\u{2013}', "ndash"),
    ('\u{2014}', "mdash"), ('\u{2018}', "lsquo"), ('\u{2019}', "rsquo"), ('\u{201a}', "sbquo"),
    ('\u{201c}', "ldquo"), ('\u{201d}', "rdquo"), ('\u{201e}', "bdquo"), ('\u{2020}', "dagger"),
    ('\u{2021}', "Dagger"), ('\u{2022}', "bull"), ('\u{2026}', "hellip"), ('\u{2030}', "permil"),
    ('\u{2032}', "prime"), ('\u{2033}', "Prime"), ('\u{2039}', "lsaquo"), ('\u{203a}', "rsaquo"),
    ('\u{203e}', "oline"), ('\u{2044}', "frasl"), ('\u{20ac}', "euro"), ('\u{2111}', "image"),
    ('\u{2118}', "weierp"), ('\u{211c}', "real"), ('\u{2122}', "trade"), ('\u{2135}', "alefsym"),
    ('\u{2190}', "larr"), ('\u{2191}', "uarr"), ('\u{2192}', "rarr"), ('\u{2193}', "darr"),
    ('\u{2194}', "harr"), ('\u{21b5}', "crarr"), ('\u{21d0}', "lArr"), ('\u{21d1}', "uArr"),
    ('\u{21d2}', "rArr"), ('\u{21d3}', "dArr"), ('\u{21d4}', "hArr"), ('\u{2200}', "forall"),
    ('\u{2202}', "part"), ('\u{2203}', "exist"), ('\u{2205}', "empty"), ('\u{2207}', "nabla"),
    ('\u{2208}', "isin"), ('\u{2209}', "notin"), ('\u{220b}', "ni"), ('\u{220f}', "prod"),
    ('\u{2211}', "sum"), ('\u{2212}', "minus"), ('\u{2217}', "lowast"), ('\u{221a}', "radic"),
    ('\u{221d}', "prop"), ('\u{221e}', "infin"), ('\u{2220}', "ang"), ('\u{2227}', "and"),
    ('\u{2228}', "or"), ('\u{2229}', "cap"), ('\u{222a}', "cup"), ('\u{222b}', "int"),
    ('\u{2234}', "there4"), ('\u{223c}', "sim"), ('\u{2245}', "cong"), ('\u{2248}', "asymp"),
    ('\u{2260}', "ne"), ('\u{2261}', "equiv"), ('\u{2264}', "le"), ('\u{2265}', "ge"),
    ('\u{2282}', "sub"), ('\u{2283}', "sup"), ('\u{2284}', "nsub"), ('\u{2286}', "sube"),
    ('\u{2287}', "supe"), ('\u{2295}', "oplus"), ('\u{2297}', "otimes"), ('\u{22a5}', "perp"),
    ('\u{22c5}', "sdot"), ('\u{2308}', "lceil"), ('\u{2309}', "rceil"), ('\u{230a}', "lfloor"),
    ('\u{230b}', "rfloor"), ('\u{2329}', "lang"), ('\u{232a}', "rang"), ('\u{25ca}', "loz"),
    ('\u{2660}', "spades"), ('\u{2663}', "clubs"), ('\u{2665}', "hearts"), ('\u{2666}', "diams"),
];

fn html4_entity(c: char) -> Option<&'static str> {
    match c {
        '\u{a0}'..='\u{ff}' => Some(LATIN1_ENTITIES[c as usize - 0xa0]),
        _ => HTML4_ENTITIES
            .binary_search_by_key(&c, |(entity_char, _)| *entity_char)
            .ok()
            .map(|index| HTML4_ENTITIES[index].1),
    }
}

/// HTML 4 escaping: markup characters plus every character with a named
/// HTML 4 entity. Apostrophes and other characters pass through.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => match html4_entity(c) {
                Some(name) => {
                    let _ = write!(out, "&{};", name);
                }
                None => out.push(c),
            },
        }
    }
    out
}

/// XML 1.0 escaping. Characters XML 1.0 cannot represent are dropped.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => {}
            '\u{7f}'..='\u{84}' | '\u{86}'..='\u{9f}' => {
                let _ = write!(out, "&#{};", c as u32);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Java string-literal escaping; non-ASCII becomes `\uXXXX`.
pub fn escape_java(value: &str) -> String {
    escape_c_like(value, false)
}

/// ECMAScript string-literal escaping; also escapes `'` and `/`.
pub fn escape_ecmascript(value: &str) -> String {
    escape_c_like(value, true)
}

fn escape_c_like(value: &str, ecmascript: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\'' if ecmascript => out.push_str("\\'"),
            '/' if ecmascript => out.push_str("\\/"),
            '\u{8}' => out.push_str("\\b"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            ' '..='\u{7e}' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04X}", unit);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("App.java"), "java");
        assert_eq!(classify("build.gradle"), "gradle");
        assert_eq!(classify("archive.tar.gz"), "gz");
        assert_eq!(classify("README"), "README");
        assert_eq!(classify("Makefile"), "Makefile");
        assert_eq!(classify(".gitignore"), "gitignore");
        assert_eq!(classify("trailing."), "trailing.");
    }

    #[test]
    fn test_classify_path() {
        assert_eq!(classify_path(Path::new("src/main/java/App.java")), "java");
        assert_eq!(classify_path(Path::new("docs/README")), "README");
    }

    #[test]
    fn test_escaper_lookup() {
        assert_eq!(escaper_for("xml")("<a>"), "&lt;a&gt;");
        assert_eq!(escaper_for("md")("<a> \"b\""), "<a> \"b\"");
        assert_eq!(escaper_for("properties")("a\\b"), "a\\b");
        // unknown keys fall back to Java escaping
        assert_eq!(escaper_for("gradle")("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn test_escape_java() {
        assert_eq!(escape_java("plain"), "plain");
        assert_eq!(escape_java("It's a \"demo\"\n"), "It's a \\\"demo\\\"\\n");
        assert_eq!(escape_java("C:\\tmp"), "C:\\\\tmp");
        assert_eq!(escape_java("caf\u{e9}"), "caf\\u00E9");
        assert_eq!(escape_java("\u{1F600}"), "\\uD83D\\uDE00");
        assert_eq!(escape_java("a/b"), "a/b");
    }

    #[test]
    fn test_escape_ecmascript() {
        assert_eq!(escape_ecmascript("It's a/b"), "It\\'s a\\/b");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml("Tom & \"Jerry\" <'x'>"),
            "Tom &amp; &quot;Jerry&quot; &lt;&apos;x&apos;&gt;"
        );
        assert_eq!(escape_xml("a\u{1}b\tc"), "ab\tc");
        assert_eq!(escape_xml("caf\u{e9}"), "caf\u{e9}");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
        assert_eq!(escape_html("it's \"ok\""), "it's &quot;ok&quot;");
        assert_eq!(
            escape_html("caf\u{e9} \u{a0}\u{ff} \u{3c0} \u{20ac} \u{2014}"),
            "caf&eacute; &nbsp;&yuml; &pi; &euro; &mdash;"
        );
        // no HTML 4 name
        assert_eq!(escape_html("\u{4e2d}"), "\u{4e2d}");
    }

    #[test]
    fn test_html4_entity_table_is_sorted() {
        assert!(HTML4_ENTITIES.windows(2).all(|pair| pair[0].0 < pair[1].0));
        assert_eq!(LATIN1_ENTITIES.len() + HTML4_ENTITIES.len(), 248);
    }
}
