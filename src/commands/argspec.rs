//! Declarative argument specifications for bot commands.
//!
//! Every command declares the flags and positional arguments it accepts as an
//! [`ArgSpec`]. The dispatcher compiles the free text following the command
//! token into a [`ParsedArgs`] set, or produces the command's usage string
//! when the text does not satisfy the spec. Parsing is a pure function of the
//! spec and the text; a failed parse never yields a partial result.

use std::collections::HashMap;

use regex::Regex;

/// A parsed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// A boolean flag that was present on the line.
    Present,
    /// A single string value.
    Single(String),
    /// A value coerced to an integer.
    Int(i64),
    /// A variadic list flag, in occurrence order.
    Many(Vec<String>),
}

/// The structured result of a successful parse.
///
/// Maps declared argument names to their values. Absent optional arguments
/// have no entry.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    values: HashMap<String, ArgValue>,
}

impl ParsedArgs {
    /// Returns whether a presence flag was given.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ArgValue::Present))
    }

    /// Returns a single string value, if present.
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Single(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns an integer-coerced value, if present.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns a variadic list value, if present.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ArgValue::Many(values)) => Some(values),
            _ => None,
        }
    }

}

/// Optional type coercion applied to a raw token.
#[derive(Debug, Clone, Copy)]
pub enum Coerce {
    /// Parse the token as a signed integer.
    Integer,
}

/// How many tokens a flag consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FlagArity {
    /// The flag is a boolean marker and consumes no value.
    Presence,
    /// The flag consumes exactly one following token.
    Value,
    /// Each occurrence consumes one token; values accumulate.
    List,
}

/// Declaration of a named flag (`--name` or `-n`).
#[derive(Debug)]
struct FlagDef {
    name: String,
    long: String,
    short: Option<char>,
    arity: FlagArity,
    coerce: Option<Coerce>,
    pattern: Option<Regex>,
}

/// Declaration of a positional argument, filled in declaration order.
#[derive(Debug)]
struct PositionalDef {
    name: String,
    required: bool,
    coerce: Option<Coerce>,
    pattern: Option<Regex>,
}

/// A parse failure carrying the command's usage string.
///
/// Usage errors are recovered locally: they are shown to the requester and
/// never logged as failures.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageError {
    /// The full usage line to show the user.
    pub usage: String,
}

/// Declarative description of a command's accepted arguments.
///
/// # Examples
///
/// ```
/// # use ratatosk::commands::argspec::ArgSpec;
/// let spec = ArgSpec::new("tell <recipient> <text>")
///     .positional("recipient", true)
///     .rest("text", true);
///
/// let args = spec.parse("bob remember the milk").unwrap();
/// assert_eq!(args.value("recipient"), Some("bob"));
/// assert_eq!(args.value("text"), Some("remember the milk"));
/// ```
#[derive(Debug)]
pub struct ArgSpec {
    usage: String,
    flags: Vec<FlagDef>,
    positionals: Vec<PositionalDef>,
    rest: Option<(String, bool)>,
    exclusive: Vec<Vec<String>>,
}

impl ArgSpec {
    /// Creates an empty spec with the given usage line.
    ///
    /// The usage line is what the requester sees on any parse failure, on
    /// empty input and on an explicit `--help`.
    pub fn new(usage: &str) -> Self {
        ArgSpec {
            usage: usage.to_owned(),
            flags: Vec::new(),
            positionals: Vec::new(),
            rest: None,
            exclusive: Vec::new(),
        }
    }

    /// Declares a boolean presence flag with long and optional short form.
    pub fn flag(mut self, name: &str, short: Option<char>) -> Self {
        self.flags.push(FlagDef {
            name: name.to_owned(),
            long: name.to_owned(),
            short,
            arity: FlagArity::Presence,
            coerce: None,
            pattern: None,
        });
        self
    }

    /// Declares a flag that consumes one value token.
    pub fn value_flag(mut self, name: &str, short: Option<char>) -> Self {
        self.flags.push(FlagDef {
            name: name.to_owned(),
            long: name.to_owned(),
            short,
            arity: FlagArity::Value,
            coerce: None,
            pattern: None,
        });
        self
    }

    /// Declares a variadic flag; every occurrence appends one value.
    pub fn list_flag(mut self, name: &str, short: Option<char>) -> Self {
        self.flags.push(FlagDef {
            name: name.to_owned(),
            long: name.to_owned(),
            short,
            arity: FlagArity::List,
            coerce: None,
            pattern: None,
        });
        self
    }

    /// Declares a positional argument, filled in declaration order.
    pub fn positional(mut self, name: &str, required: bool) -> Self {
        self.positionals.push(PositionalDef {
            name: name.to_owned(),
            required,
            coerce: None,
            pattern: None,
        });
        self
    }

    /// Joins all remaining words into one trailing free-text argument.
    pub fn rest(mut self, name: &str, required: bool) -> Self {
        self.rest = Some((name.to_owned(), required));
        self
    }

    /// Applies integer coercion to the most recently declared argument.
    pub fn integer(mut self) -> Self {
        if let Some(def) = self.positionals.last_mut() {
            def.coerce = Some(Coerce::Integer);
        } else if let Some(def) = self.flags.last_mut() {
            def.coerce = Some(Coerce::Integer);
        }
        self
    }

    /// Constrains the most recently declared argument to a regex.
    ///
    /// # Panics
    ///
    /// Panics if the pattern does not compile. Specs are built once at
    /// registration time, so a bad pattern is a programming error.
    pub fn pattern(mut self, pattern: &str) -> Self {
        let regex = Regex::new(pattern).unwrap_or_else(|e| panic!("bad arg pattern: {}", e));
        if let Some(def) = self.positionals.last_mut() {
            def.pattern = Some(regex);
        } else if let Some(def) = self.flags.last_mut() {
            def.pattern = Some(regex);
        }
        self
    }

    /// Declares a mutual-exclusion group: at most one of these flags may be
    /// present on a line.
    pub fn exclusive(mut self, names: &[&str]) -> Self {
        self.exclusive
            .push(names.iter().map(|n| (*n).to_owned()).collect());
        self
    }

    /// Returns the usage line.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    fn usage_error(&self) -> UsageError {
        UsageError {
            usage: format!("usage: {}", self.usage),
        }
    }

    fn find_flag(&self, token: &str) -> Option<&FlagDef> {
        if let Some(long) = token.strip_prefix("--") {
            return self.flags.iter().find(|def| def.long == long);
        }
        if let Some(short) = token.strip_prefix('-') {
            let mut chars = short.chars();
            let (first, remainder) = (chars.next()?, chars.next());
            if remainder.is_none() {
                return self.flags.iter().find(|def| def.short == Some(first));
            }
        }
        None
    }

    fn check(def_pattern: &Option<Regex>, value: &str) -> bool {
        match def_pattern {
            Some(pattern) => pattern.is_match(value),
            None => true,
        }
    }

    fn coerce(coerce: Option<Coerce>, value: String) -> Result<ArgValue, ()> {
        match coerce {
            Some(Coerce::Integer) => value
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|_| ()),
            None => Ok(ArgValue::Single(value)),
        }
    }

    /// Compiles free text into a structured argument set.
    ///
    /// Tokenizes on whitespace, consuming recognized flag tokens in either
    /// `--name` or `-n` form, then fills positional arguments in declaration
    /// order and joins any surplus into the trailing `rest` argument when one
    /// is declared.
    ///
    /// # Returns
    ///
    /// * `Ok(ParsedArgs)` - Every constraint held
    /// * `Err(UsageError)` - Empty input, explicit `--help`, an unknown flag,
    ///   a missing flag value, more than one member of an exclusive group, a
    ///   missing required positional, a failed integer coercion or a value
    ///   failing its regex constraint
    pub fn parse(&self, raw: &str) -> Result<ParsedArgs, UsageError> {
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        // Commands that accept no input at all register without a spec, so a
        // spec with nothing to parse is a usage request.
        if tokens.is_empty() || tokens.iter().any(|t| *t == "--help") {
            return Err(self.usage_error());
        }

        let mut values: HashMap<String, ArgValue> = HashMap::new();
        let mut positional_index = 0;
        let mut rest_words: Vec<String> = Vec::new();
        let mut rest_started = false;

        let mut stream = tokens.into_iter().peekable();
        while let Some(token) = stream.next() {
            // Once every positional is filled and only the trailing free
            // text remains, flag recognition stops, so a tell body may
            // contain literal dashes from its first word on.
            if positional_index >= self.positionals.len() && self.rest.is_some() {
                rest_started = true;
            }

            if !rest_started && token.starts_with('-') && token.len() > 1 {
                let Some(def) = self.find_flag(token) else {
                    return Err(self.usage_error());
                };

                match def.arity {
                    FlagArity::Presence => {
                        values.insert(def.name.clone(), ArgValue::Present);
                    }
                    FlagArity::Value | FlagArity::List => {
                        let Some(value) = stream.next() else {
                            return Err(self.usage_error());
                        };
                        if !Self::check(&def.pattern, value) {
                            return Err(self.usage_error());
                        }
                        if def.arity == FlagArity::List {
                            match values
                                .entry(def.name.clone())
                                .or_insert_with(|| ArgValue::Many(Vec::new()))
                            {
                                ArgValue::Many(list) => list.push(value.to_owned()),
                                _ => return Err(self.usage_error()),
                            }
                        } else {
                            let Ok(coerced) = Self::coerce(def.coerce, value.to_owned()) else {
                                return Err(self.usage_error());
                            };
                            values.insert(def.name.clone(), coerced);
                        }
                    }
                }
                continue;
            }

            if positional_index < self.positionals.len() {
                let def = &self.positionals[positional_index];
                positional_index += 1;
                if !Self::check(&def.pattern, token) {
                    return Err(self.usage_error());
                }
                let Ok(coerced) = Self::coerce(def.coerce, token.to_owned()) else {
                    return Err(self.usage_error());
                };
                values.insert(def.name.clone(), coerced);
            } else if self.rest.is_some() {
                rest_started = true;
                rest_words.push(token.to_owned());
            } else {
                // Surplus token with nowhere to go.
                return Err(self.usage_error());
            }
        }

        // Required positionals must all have been filled.
        for def in &self.positionals[positional_index..] {
            if def.required {
                return Err(self.usage_error());
            }
        }

        if let Some((name, required)) = &self.rest {
            if rest_words.is_empty() {
                if *required {
                    return Err(self.usage_error());
                }
            } else {
                values.insert(name.clone(), ArgValue::Single(rest_words.join(" ")));
            }
        }

        for group in &self.exclusive {
            let present = group.iter().filter(|n| values.contains_key(*n)).count();
            if present > 1 {
                return Err(self.usage_error());
            }
        }

        Ok(ParsedArgs { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tell_spec() -> ArgSpec {
        ArgSpec::new("tell <recipient> <text>")
            .positional("recipient", true)
            .rest("text", true)
    }

    #[test]
    fn test_parse_positional_and_rest() {
        let args = tell_spec().parse("bob remember the milk").unwrap();
        assert_eq!(args.value("recipient"), Some("bob"));
        assert_eq!(args.value("text"), Some("remember the milk"));
    }

    #[test]
    fn test_parse_missing_required_positional() {
        let err = tell_spec().parse("").unwrap_err();
        assert_eq!(err.usage, "usage: tell <recipient> <text>");
    }

    #[test]
    fn test_parse_missing_required_rest() {
        assert!(tell_spec().parse("bob").is_err());
    }

    #[test]
    fn test_parse_help_yields_usage() {
        let spec = ArgSpec::new("seen <nick>").positional("nick", true);
        let err = spec.parse("--help").unwrap_err();
        assert_eq!(err.usage, "usage: seen <nick>");
    }

    #[test]
    fn test_parse_empty_input_always_yields_usage() {
        let spec = ArgSpec::new("quote [index]").positional("index", false);
        let err = spec.parse("").unwrap_err();
        assert_eq!(err.usage, "usage: quote [index]");
    }

    #[test]
    fn test_parse_presence_flag_long_and_short() {
        let spec = ArgSpec::new("seen [-p] <nick>")
            .flag("private", Some('p'))
            .positional("nick", true);

        let args = spec.parse("--private alice").unwrap();
        assert!(args.flag("private"));
        assert_eq!(args.value("nick"), Some("alice"));

        let args = spec.parse("-p alice").unwrap();
        assert!(args.flag("private"));
    }

    #[test]
    fn test_parse_unknown_flag_is_usage_error() {
        let spec = ArgSpec::new("seen <nick>").positional("nick", true);
        assert!(spec.parse("--nope alice").is_err());
    }

    #[test]
    fn test_parse_value_flag() {
        let spec = ArgSpec::new("quote [--index <n>] <nick>")
            .value_flag("index", Some('i'))
            .integer()
            .positional("nick", true);

        let args = spec.parse("--index 3 alice").unwrap();
        assert_eq!(args.int("index"), Some(3));
        assert_eq!(args.value("nick"), Some("alice"));
    }

    #[test]
    fn test_parse_value_flag_missing_value() {
        let spec = ArgSpec::new("quote [--index <n>]").value_flag("index", None);
        assert!(spec.parse("--index").is_err());
    }

    #[test]
    fn test_parse_integer_coercion_failure() {
        let spec = ArgSpec::new("quote <index>")
            .positional("index", true)
            .integer();
        assert!(spec.parse("three").is_err());
        assert_eq!(spec.parse("3").unwrap().int("index"), Some(3));
    }

    #[test]
    fn test_parse_list_flag_accumulates() {
        let spec = ArgSpec::new("sub [--topic <t>]...").list_flag("topic", Some('t'));
        let args = spec.parse("-t infra -t releases").unwrap();
        assert_eq!(
            args.list("topic"),
            Some(&["infra".to_owned(), "releases".to_owned()][..])
        );
    }

    #[test]
    fn test_parse_regex_constraint() {
        let spec = ArgSpec::new("subscribe <topic>")
            .positional("topic", true)
            .pattern(r"^\w+$");
        assert!(spec.parse("infra").is_ok());
        assert!(spec.parse("@infra!").is_err());
    }

    #[test]
    fn test_parse_exclusive_group() {
        let spec = ArgSpec::new("seen [-p|-n] <nick>")
            .flag("private", Some('p'))
            .flag("notice", Some('n'))
            .positional("nick", true)
            .exclusive(&["private", "notice"]);

        assert!(spec.parse("-p alice").is_ok());
        assert!(spec.parse("-n alice").is_ok());
        assert!(spec.parse("-p -n alice").is_err());
    }

    #[test]
    fn test_parse_surplus_token_without_rest() {
        let spec = ArgSpec::new("seen <nick>").positional("nick", true);
        assert!(spec.parse("alice bob").is_err());
    }

    #[test]
    fn test_parse_dashes_allowed_inside_rest() {
        let args = tell_spec().parse("bob the build is -1 again").unwrap();
        assert_eq!(args.value("text"), Some("the build is -1 again"));
    }

    #[test]
    fn test_parse_rest_may_start_with_dash() {
        let args = tell_spec().parse("bob -> meeting moved").unwrap();
        assert_eq!(args.value("text"), Some("-> meeting moved"));

        let args = tell_spec().parse("bob --tomorrow instead").unwrap();
        assert_eq!(args.value("text"), Some("--tomorrow instead"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let spec = tell_spec();
        let a = spec.parse("bob hello there").unwrap();
        let b = spec.parse("bob hello there").unwrap();
        assert_eq!(a.value("text"), b.value("text"));
        assert_eq!(a.value("recipient"), b.value("recipient"));
    }
}
