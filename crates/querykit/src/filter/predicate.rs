//! Predicate tree and its text rendering.
//!
//! Every node carries the connector that precedes it, resolved when the node
//! was appended. Rendering walks the tree once and joins tokens with single
//! spaces, so the output never depends on how callers nested their closures.

/// Connector written in front of a predicate or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Where,
    And,
    Or,
    /// First element inside an open parenthesis.
    None,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Where => "WHERE",
            Modifier::And => "AND",
            Modifier::Or => "OR",
            Modifier::None => "",
        }
    }
}

/// Operand of `IS` / `NOT`, written inline; never bound as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Null,
    True,
    False,
    Unknown,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Null => "NULL",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Unknown => "UNKNOWN",
        }
    }
}

/// Binary comparison operators taking one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Like,
}

impl Comparator {
    fn as_str(self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::NotEqual => "<>",
            Comparator::Less => "<",
            Comparator::Greater => ">",
            Comparator::LessOrEqual => "<=",
            Comparator::GreaterOrEqual => ">=",
            Comparator::Like => "LIKE",
        }
    }
}

/// Test applied to a column. Parameter fields hold placeholder names.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Test {
    Compare(Comparator, String),
    IsNull,
    NotNull,
    Is(Keyword),
    Not(Keyword),
    Between { min: String, max: String },
    InList { names: Vec<String>, negated: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    Comparison {
        modifier: Modifier,
        column: String,
        test: Test,
    },
    Group {
        modifier: Modifier,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    pub(crate) fn modifier(&self) -> Modifier {
        match self {
            Predicate::Comparison { modifier, .. } | Predicate::Group { modifier, .. } => *modifier,
        }
    }

    pub(crate) fn with_modifier(mut self, lead: Modifier) -> Self {
        match &mut self {
            Predicate::Comparison { modifier, .. } | Predicate::Group { modifier, .. } => {
                *modifier = lead
            }
        }
        self
    }

    /// Append this node's tokens to `out`.
    pub(crate) fn render_into(&self, out: &mut Vec<String>) {
        push_modifier(self.modifier(), out);
        match self {
            Predicate::Comparison { column, test, .. } => {
                out.push(column.clone());
                match test {
                    Test::Compare(op, name) => {
                        out.push(op.as_str().to_string());
                        out.push(format!("@{name}"));
                    }
                    Test::IsNull => out.push("IS NULL".to_string()),
                    Test::NotNull => out.push("IS NOT NULL".to_string()),
                    Test::Is(keyword) => out.push(format!("IS {}", keyword.as_str())),
                    Test::Not(keyword) => out.push(format!("NOT {}", keyword.as_str())),
                    Test::Between { min, max } => {
                        out.push(format!("BETWEEN @{min} AND @{max}"));
                    }
                    Test::InList { names, negated } => {
                        out.push(if *negated { "NOT IN" } else { "IN" }.to_string());
                        let markers: Vec<String> =
                            names.iter().map(|name| format!("@{name}")).collect();
                        out.push(format!("( {} )", markers.join(", ")));
                    }
                }
            }
            Predicate::Group { children, .. } => {
                out.push("(".to_string());
                for child in children {
                    child.render_into(out);
                }
                out.push(")".to_string());
            }
        }
    }
}

fn push_modifier(modifier: Modifier, out: &mut Vec<String>) {
    let token = modifier.as_str();
    if !token.is_empty() {
        out.push(token.to_string());
    }
}

/// Replace the connector of the first node.
pub(crate) fn lead_with(mut nodes: Vec<Predicate>, lead: Modifier) -> Vec<Predicate> {
    if !nodes.is_empty() {
        let first = nodes.remove(0);
        nodes.insert(0, first.with_modifier(lead));
    }
    nodes
}

/// Join `next` onto `existing` with `AND`.
///
/// A side whose top level mixes in anything but `AND` is parenthesized so
/// the combination keeps the meaning of both filters.
pub(crate) fn conjoin(existing: Vec<Predicate>, next: Vec<Predicate>) -> Vec<Predicate> {
    if next.is_empty() {
        return existing;
    }
    if existing.is_empty() {
        return lead_with(next, Modifier::Where);
    }
    let mut out = enclose(existing, Modifier::Where);
    out.extend(enclose(next, Modifier::And));
    out
}

fn enclose(nodes: Vec<Predicate>, lead: Modifier) -> Vec<Predicate> {
    let mixed = nodes.iter().skip(1).any(|n| n.modifier() != Modifier::And);
    if !mixed {
        return lead_with(nodes, lead);
    }
    vec![Predicate::Group {
        modifier: lead,
        children: lead_with(nodes, Modifier::None),
    }]
}

/// Render a predicate list, collapsing any whitespace run to one space.
pub(crate) fn render(nodes: &[Predicate]) -> String {
    let mut tokens = Vec::new();
    for node in nodes {
        node.render_into(&mut tokens);
    }
    normalize(&tokens.join(" "))
}

pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(modifier: Modifier, column: &str, op: Comparator, name: &str) -> Predicate {
        Predicate::Comparison {
            modifier,
            column: column.to_string(),
            test: Test::Compare(op, name.to_string()),
        }
    }

    #[test]
    fn renders_comparison_tokens() {
        let nodes = vec![
            cmp(Modifier::Where, "Id", Comparator::GreaterOrEqual, "Id0"),
            cmp(Modifier::Or, "Price", Comparator::NotEqual, "Price1"),
        ];
        assert_eq!(render(&nodes), "WHERE Id >= @Id0 OR Price <> @Price1");
    }

    #[test]
    fn renders_nested_group() {
        let nodes = vec![Predicate::Group {
            modifier: Modifier::Where,
            children: vec![
                Predicate::Comparison {
                    modifier: Modifier::None,
                    column: "Id".to_string(),
                    test: Test::NotNull,
                },
                Predicate::Group {
                    modifier: Modifier::And,
                    children: vec![cmp(Modifier::None, "Name", Comparator::Like, "Name0")],
                },
            ],
        }];
        assert_eq!(
            render(&nodes),
            "WHERE ( Id IS NOT NULL AND ( Name LIKE @Name0 ) )"
        );
    }

    #[test]
    fn renders_keywords_inline() {
        let nodes = vec![
            Predicate::Comparison {
                modifier: Modifier::Where,
                column: "Active".to_string(),
                test: Test::Is(Keyword::True),
            },
            Predicate::Comparison {
                modifier: Modifier::And,
                column: "Deleted".to_string(),
                test: Test::Not(Keyword::Unknown),
            },
        ];
        assert_eq!(render(&nodes), "WHERE Active IS TRUE AND Deleted NOT UNKNOWN");
    }

    #[test]
    fn renders_in_list_and_between() {
        let nodes = vec![
            Predicate::Comparison {
                modifier: Modifier::Where,
                column: "Id".to_string(),
                test: Test::InList {
                    names: vec!["Id0".into(), "Id1".into()],
                    negated: true,
                },
            },
            Predicate::Comparison {
                modifier: Modifier::And,
                column: "Age".to_string(),
                test: Test::Between {
                    min: "Min2".into(),
                    max: "Max3".into(),
                },
            },
        ];
        assert_eq!(
            render(&nodes),
            "WHERE Id NOT IN ( @Id0, @Id1 ) AND Age BETWEEN @Min2 AND @Max3"
        );
    }

    #[test]
    fn conjoin_parenthesizes_or_chains() {
        let left = vec![
            cmp(Modifier::Where, "A", Comparator::Equal, "A0"),
            cmp(Modifier::Or, "B", Comparator::Equal, "B1"),
        ];
        let right = vec![
            cmp(Modifier::Where, "C", Comparator::Equal, "C2"),
            cmp(Modifier::And, "D", Comparator::Equal, "D3"),
        ];
        assert_eq!(
            render(&conjoin(left, right)),
            "WHERE ( A = @A0 OR B = @B1 ) AND C = @C2 AND D = @D3"
        );
    }

    #[test]
    fn conjoin_with_empty_side() {
        let only = vec![cmp(Modifier::Where, "A", Comparator::Equal, "A0")];
        assert_eq!(render(&conjoin(Vec::new(), only.clone())), "WHERE A = @A0");
        assert_eq!(render(&conjoin(only, Vec::new())), "WHERE A = @A0");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  SELECT   a,\n b  FROM t "), "SELECT a, b FROM t");
    }
}
