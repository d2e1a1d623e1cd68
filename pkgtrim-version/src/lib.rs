use std::cmp::Ordering;
use std::error::Error as StdError;
use std::fmt;

/// A parsed APK package version.
///
/// Grammar: `digits{.digits}[letter]{_suffix[digits]}[~hash][-rN]`,
/// e.g. `1.2.3`, `2.0_rc1`, `1.36.1b-r4`, `6.6_p20240302~a1b2-r0`.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    components: Vec<String>,
    letter: Option<char>,
    suffixes: Vec<(Suffix, u64)>,
    hash: Option<String>,
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Suffix {
    Alpha,
    Beta,
    Pre,
    Rc,
    Cvs,
    Svn,
    Git,
    Hg,
    P,
}

impl Suffix {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "alpha" => Some(Suffix::Alpha),
            "beta" => Some(Suffix::Beta),
            "pre" => Some(Suffix::Pre),
            "rc" => Some(Suffix::Rc),
            "cvs" => Some(Suffix::Cvs),
            "svn" => Some(Suffix::Svn),
            "git" => Some(Suffix::Git),
            "hg" => Some(Suffix::Hg),
            "p" => Some(Suffix::P),
            _ => None,
        }
    }

    /// Pre-release suffixes sort before the bare version, the rest after it.
    fn is_pre_release(self) -> bool {
        matches!(
            self,
            Suffix::Alpha | Suffix::Beta | Suffix::Pre | Suffix::Rc
        )
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    input: String,
    message: String,
}

impl Error {
    pub fn new(input: String, message: String) -> Self {
        Self { input, message }
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.input)
    }
}

impl StdError for Error {}

impl Version {
    pub fn parse(original: &str) -> Result<Self, Error> {
        let fail = |message: &str| Error::new(original.to_string(), message.to_string());

        let s = original.trim();
        if s.is_empty() {
            return Err(fail("empty version"));
        }

        let (s, revision) = match s.rsplit_once("-r") {
            Some((head, rev)) => {
                let revision = rev
                    .parse::<u64>()
                    .map_err(|_| fail("invalid package revision"))?;
                (head, revision)
            }
            None => (s, 0),
        };

        let (s, hash) = match s.split_once('~') {
            Some((head, hash)) => {
                if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(fail("invalid commit hash"));
                }
                (head, Some(hash.to_string()))
            }
            None => (s, None),
        };

        let mut parts = s.split('_');
        let head = parts.next().unwrap_or_default();

        let mut suffixes = Vec::new();
        for part in parts {
            let split = part
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(part.len());
            let (name, number) = part.split_at(split);
            let suffix = Suffix::parse(name).ok_or_else(|| fail("unknown version suffix"))?;
            let number = if number.is_empty() {
                0
            } else {
                number
                    .parse::<u64>()
                    .map_err(|_| fail("invalid suffix number"))?
            };
            suffixes.push((suffix, number));
        }

        let (digits, letter) = match head.chars().last() {
            Some(c) if c.is_ascii_lowercase() => (&head[..head.len() - 1], Some(c)),
            _ => (head, None),
        };

        let mut components = Vec::new();
        for component in digits.split('.') {
            if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
                return Err(fail("invalid version component"));
            }
            components.push(component.to_string());
        }

        Ok(Version {
            original: original.to_string(),
            components,
            letter,
            suffixes,
            hash,
            revision,
        })
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }
}

fn compare_component(index: usize, a: &str, b: &str) -> Ordering {
    // Components after the first with a leading zero compare as fractions.
    let fractional = index > 0 && (a.starts_with('0') || b.starts_with('0'));
    if fractional {
        return a.cmp(b);
    }

    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match (self.components.get(i), other.components.get(i)) {
                (Some(a), Some(b)) => match compare_component(i, a, b) {
                    Ordering::Equal => {}
                    ord => return ord,
                },
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (None, None) => break,
            }
        }

        match self.letter.cmp(&other.letter) {
            Ordering::Equal => {}
            ord => return ord,
        }

        let len = self.suffixes.len().max(other.suffixes.len());
        for i in 0..len {
            match (self.suffixes.get(i), other.suffixes.get(i)) {
                (Some(a), Some(b)) => match a.cmp(b) {
                    Ordering::Equal => {}
                    ord => return ord,
                },
                (Some((suffix, _)), None) => {
                    return if suffix.is_pre_release() {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    };
                }
                (None, Some((suffix, _))) => {
                    return if suffix.is_pre_release() {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                }
                (None, None) => break,
            }
        }

        self.revision.cmp(&other.revision)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Compares two version strings, falling back to plain string order when
/// either side does not parse.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Fuzzy,
}

impl Operator {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "=" => Some(Operator::Equal),
            ">" => Some(Operator::Greater),
            ">=" => Some(Operator::GreaterOrEqual),
            "<" => Some(Operator::Less),
            "<=" => Some(Operator::LessOrEqual),
            "~" | "=~" | "~=" => Some(Operator::Fuzzy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Fuzzy => "~",
        }
    }
}

/// A dependency or provides entry: `name[op version][@pin]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub operator: Option<Operator>,
    pub version: Option<String>,
    pub pin: Option<String>,
}

impl Constraint {
    pub fn parse(original: &str) -> Result<Self, Error> {
        let s = original.trim();

        let (s, pin) = match s.split_once('@') {
            Some((head, pin)) if !head.is_empty() => (head, Some(pin.to_string())),
            _ => (s, None),
        };

        let Some(op_start) = s.find(['=', '<', '>', '~']) else {
            return Ok(Constraint {
                name: s.to_string(),
                operator: None,
                version: None,
                pin,
            });
        };

        let (name, rest) = s.split_at(op_start);
        let op_end = rest
            .find(|c: char| !matches!(c, '=' | '<' | '>' | '~'))
            .unwrap_or(rest.len());
        let (op, version) = rest.split_at(op_end);

        let operator = Operator::parse(op).ok_or_else(|| {
            Error::new(original.to_string(), format!("unknown operator '{}'", op))
        })?;

        Ok(Constraint {
            name: name.to_string(),
            operator: Some(operator),
            version: Some(version.to_string()).filter(|v| !v.is_empty()),
            pin,
        })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let (Some(op), Some(version)) = (self.operator, &self.version) {
            write!(f, "{}{}", op.as_str(), version)?;
        }
        if let Some(pin) = &self.pin {
            write!(f, "@{}", pin)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn orders_numeric_components() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.2.1") > v("1.2"));
    }

    #[test]
    fn orders_revisions() {
        assert!(v("1.0-r1") > v("1.0-r0"));
        assert!(v("1.0-r10") > v("1.0-r9"));
        assert_eq!(v("1.0"), v("1.0-r0"));
    }

    #[test]
    fn pre_release_suffix_sorts_before_release() {
        assert!(v("1.0_rc1") < v("1.0"));
        assert!(v("1.0_alpha") < v("1.0_beta"));
        assert!(v("1.0_rc2") > v("1.0_rc1"));
        assert!(v("1.0_p1") > v("1.0"));
    }

    #[test]
    fn letter_sorts_after_bare_version() {
        assert!(v("1.36.1b") > v("1.36.1"));
        assert!(v("1.36.1b") < v("1.36.1c"));
    }

    #[test]
    fn leading_zero_components_compare_as_fractions() {
        assert!(v("1.02") < v("1.1"));
    }

    #[test]
    fn parses_hash_and_revision() {
        let parsed = v("6.6_p20240302~a1b2c3-r4");
        assert_eq!(parsed.hash(), Some("a1b2c3"));
        assert_eq!(parsed.revision(), 4);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("abc").is_err());
        assert!(Version::parse("1.0_banana").is_err());
        assert!(Version::parse("1..0").is_err());
    }

    #[test]
    fn compare_falls_back_to_string_order() {
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("not-a-version", "zzz"), Ordering::Less);
        assert_eq!(compare("same", "same"), Ordering::Equal);
    }

    #[test]
    fn parses_constraints() {
        let plain = Constraint::parse("busybox").unwrap();
        assert_eq!(plain.name, "busybox");
        assert_eq!(plain.operator, None);

        let ranged = Constraint::parse("openssl>=3.0.0").unwrap();
        assert_eq!(ranged.name, "openssl");
        assert_eq!(ranged.operator, Some(Operator::GreaterOrEqual));
        assert_eq!(ranged.version.as_deref(), Some("3.0.0"));

        let pinned = Constraint::parse("go=1.21.0-r0@local").unwrap();
        assert_eq!(pinned.name, "go");
        assert_eq!(pinned.pin.as_deref(), Some("local"));
        assert_eq!(pinned.to_string(), "go=1.21.0-r0@local");
    }

    #[test]
    fn virtual_names_keep_their_prefix() {
        let so = Constraint::parse("so:libc.musl-x86_64.so.1=1").unwrap();
        assert_eq!(so.name, "so:libc.musl-x86_64.so.1");
        assert_eq!(so.version.as_deref(), Some("1"));
    }
}
