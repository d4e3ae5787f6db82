//! Compile-time elimination of context directives
//!
//! `if ($SERVER) { ... }` and friends are resolved statically when a file
//! targets a single context. A condition is either a single directive atom
//! or a left-associated `&&` chain; in the latter case the atoms are pulled
//! out and the remaining operands form a residual runtime check.

use flamework_ast::{Expr, ExprKind, LogicalOp, UnaryOp};

use crate::{CompileContext, MacroRegistry};

/// A directive atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Server,
    Client,
    NotServer,
    NotClient,
}

impl Directive {
    pub fn negate(self) -> Self {
        match self {
            Directive::Server => Directive::NotServer,
            Directive::Client => Directive::NotClient,
            Directive::NotServer => Directive::Server,
            Directive::NotClient => Directive::Client,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Directive::Server => 1,
            Directive::Client => 1 << 1,
            Directive::NotServer => 1 << 2,
            Directive::NotClient => 1 << 3,
        }
    }

    /// Value of the atom when compiling for `context`; `None` for Shared
    pub fn evaluate(self, context: CompileContext) -> Option<bool> {
        let is_server = match context {
            CompileContext::Server => true,
            CompileContext::Client => false,
            CompileContext::Shared => return None,
        };
        Some(match self {
            Directive::Server => is_server,
            Directive::Client => !is_server,
            Directive::NotServer => !is_server,
            Directive::NotClient => is_server,
        })
    }
}

/// The set of atoms found in one condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectiveSet(u8);

impl DirectiveSet {
    pub fn insert(&mut self, directive: Directive) {
        self.0 |= directive.bit();
    }

    pub fn contains(&self, directive: Directive) -> bool {
        self.0 & directive.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether no context can satisfy every atom at once
    pub fn is_contradictory(&self) -> bool {
        use Directive::*;
        (self.contains(Server) && self.contains(Client))
            || (self.contains(NotServer) && self.contains(NotClient))
            || (self.contains(Server) && self.contains(NotServer))
            || (self.contains(Client) && self.contains(NotClient))
    }

    fn affirms_server(&self) -> bool {
        self.contains(Directive::Server) || self.contains(Directive::NotClient)
    }

    fn affirms_client(&self) -> bool {
        self.contains(Directive::Client) || self.contains(Directive::NotServer)
    }
}

impl FromIterator<Directive> for DirectiveSet {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        let mut set = DirectiveSet::default();
        for directive in iter {
            set.insert(directive);
        }
        set
    }
}

/// A condition split into directive atoms and the leftover runtime check
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveCondition {
    pub directives: DirectiveSet,
    /// Non-directive operands, re-joined with `&&` in source order
    pub residual: Option<Expr>,
}

impl DirectiveCondition {
    /// A lone atom with nothing left to check at runtime
    pub fn is_simple(&self) -> bool {
        self.residual.is_none()
    }
}

/// What to emit for a directive-gated `if`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep only the then-branch
    Then,
    /// Keep only the else-branch, if any
    Else,
    /// Leave the condition as an ordinary runtime check
    Runtime,
}

/// Recognize a single directive atom: an identifier or a zero-argument
/// call bound to a directive declaration, optionally negated with `!`
pub fn directive_atom(registry: &MacroRegistry, expr: &Expr) -> Option<Directive> {
    match &expr.kind {
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => directive_atom(registry, operand).map(Directive::negate),
        ExprKind::Ident(ident) => ident.symbol.and_then(|s| registry.directive(s)),
        ExprKind::Property { symbol, .. } => symbol.and_then(|s| registry.directive(s)),
        ExprKind::Call(call) if call.args.is_empty() => call
            .callee
            .symbol()
            .and_then(|s| registry.directive(s)),
        _ => None,
    }
}

fn flatten_and<'e>(expr: &'e Expr, operands: &mut Vec<&'e Expr>) {
    match &expr.kind {
        ExprKind::Logical {
            op: LogicalOp::And,
            left,
            right,
        } => {
            flatten_and(left, operands);
            flatten_and(right, operands);
        }
        _ => operands.push(expr),
    }
}

/// Split `condition` into directives and a residual; `None` when the
/// condition mentions no directive at all
pub fn classify(registry: &MacroRegistry, condition: &Expr) -> Option<DirectiveCondition> {
    let mut operands = Vec::new();
    flatten_and(condition, &mut operands);

    let mut directives = DirectiveSet::default();
    let mut rest = Vec::new();
    for operand in operands {
        match directive_atom(registry, operand) {
            Some(directive) => directives.insert(directive),
            None => rest.push(operand),
        }
    }
    if directives.is_empty() {
        return None;
    }

    let residual = rest.into_iter().cloned().reduce(|left, right| {
        let span = left.span.merge(right.span);
        Expr::new(
            ExprKind::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    });
    Some(DirectiveCondition {
        directives,
        residual,
    })
}

/// Apply the elimination table to a classified condition
pub fn decide(directives: DirectiveSet, context: CompileContext) -> Decision {
    if context == CompileContext::Shared {
        return Decision::Runtime;
    }
    if directives.is_contradictory() {
        return Decision::Else;
    }
    let wanted = if directives.affirms_server() {
        CompileContext::Server
    } else if directives.affirms_client() {
        CompileContext::Client
    } else {
        return Decision::Runtime;
    };
    if context == wanted {
        Decision::Then
    } else {
        Decision::Else
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{and, call0, ident, not, Fixture};

    fn set(directives: &[Directive]) -> DirectiveSet {
        directives.iter().copied().collect()
    }

    #[test]
    fn test_decision_table() {
        use CompileContext as Ctx;
        use Directive::*;

        let cases: &[(&[Directive], CompileContext, Decision)] = &[
            (&[Server], Ctx::Server, Decision::Then),
            (&[Server], Ctx::Client, Decision::Else),
            (&[Client], Ctx::Client, Decision::Then),
            (&[Client], Ctx::Server, Decision::Else),
            (&[NotServer], Ctx::Client, Decision::Then),
            (&[NotServer], Ctx::Server, Decision::Else),
            (&[NotClient], Ctx::Server, Decision::Then),
            (&[Server, NotClient], Ctx::Server, Decision::Then),
            (&[Server, NotClient], Ctx::Client, Decision::Else),
            (&[Client, NotServer], Ctx::Client, Decision::Then),
            (&[Client, NotServer], Ctx::Server, Decision::Else),
            (&[Server, Client], Ctx::Server, Decision::Else),
            (&[Server, Client], Ctx::Client, Decision::Else),
            (&[NotServer, NotClient], Ctx::Server, Decision::Else),
            (&[Server], Ctx::Shared, Decision::Runtime),
            (&[Server, Client], Ctx::Shared, Decision::Runtime),
        ];
        for (directives, context, expected) in cases {
            assert_eq!(
                decide(set(directives), *context),
                *expected,
                "{:?} under {:?}",
                directives,
                context
            );
        }
    }

    #[test]
    fn test_contradictions() {
        use Directive::*;
        assert!(set(&[Server, Client]).is_contradictory());
        assert!(set(&[NotServer, NotClient]).is_contradictory());
        assert!(set(&[Server, NotServer]).is_contradictory());
        assert!(!set(&[Server, NotClient]).is_contradictory());
    }

    #[test]
    fn test_atoms_in_both_forms() {
        let fixture = Fixture::new();
        let registry = fixture.registry();
        let server = fixture.global("$SERVER");
        let client = fixture.global("$CLIENT");

        assert_eq!(directive_atom(&registry, &server), Some(Directive::Server));
        assert_eq!(
            directive_atom(&registry, &call0(client.clone())),
            Some(Directive::Client)
        );
        assert_eq!(
            directive_atom(&registry, &not(not(not(server)))),
            Some(Directive::NotServer)
        );
        assert_eq!(directive_atom(&registry, &ident("ready")), None);
    }

    #[test]
    fn test_classify_keeps_residual_order() {
        let fixture = Fixture::new();
        let registry = fixture.registry();
        let condition = and(
            and(ident("a"), fixture.global("$SERVER")),
            and(ident("b"), not(fixture.global("$CLIENT"))),
        );

        let classified = classify(&registry, &condition).expect("directive condition");
        assert!(classified.directives.contains(Directive::Server));
        assert!(classified.directives.contains(Directive::NotClient));
        assert_eq!(classified.residual, Some(and(ident("a"), ident("b"))));
        assert!(!classified.is_simple());
    }

    #[test]
    fn test_plain_condition_is_not_classified() {
        let fixture = Fixture::new();
        let registry = fixture.registry();
        assert!(classify(&registry, &and(ident("a"), ident("b"))).is_none());
    }
}
