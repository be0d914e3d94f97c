// Resolution strategies for locator-typed expressions.
//
// Each strategy handles one family of syntax node kinds and may recurse
// into the resolver for sub-expressions:
// 1. Literal    - `nil` collections
// 2. Unary      - `&x`, `*x`, `(x)`
// 3. Composite  - `schema.GroupVersionResource{...}`, slice, array and map literals
// 4. Identifier - bindings, chains of them, range variables
// 5. Selector   - package-level values in other corpus packages: `pkg.GVRs`
// 6. Call       - constructor calls and functions returning locators

pub mod call;
pub mod composite;
pub mod identifier;
pub mod literal;
pub mod selector;
pub mod unary;

pub use call::CallStrategy;
pub use composite::CompositeStrategy;
pub use identifier::IdentifierStrategy;
pub use literal::LiteralStrategy;
pub use selector::SelectorStrategy;
pub use unary::UnaryStrategy;
