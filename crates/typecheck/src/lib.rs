//! Static type inference and checking for Ruby.
//!
//! Sources are parsed by [`ruby_syntax`] and mapped into [`pin::Pin`]s, one
//! per declaration. An [`ApiMap`] indexes the pins of every source together
//! with the bundled core library and answers namespace, ancestry and method
//! queries. A [`Probe`] infers the types of expressions and signatures
//! against a snapshot, and a [`TypeChecker`] reports documentation gaps and
//! type mismatches for one file.
//!
//! ```no_run
//! use typecheck::{CheckLevel, TypeChecker};
//!
//! let checker = TypeChecker::load_string("class Foo\n  def bar; end\nend\n", "foo.rb");
//! for problem in checker.problems(CheckLevel::Strict) {
//!     println!("{problem}");
//! }
//! ```

pub mod api_map;
pub mod complex_type;
pub mod core_library;
pub mod docstring;
pub mod error;
pub mod library;
pub mod pin;
pub mod source;
pub mod source_map;
pub mod type_checker;

pub use api_map::{ApiMap, Inference, Probe};
pub use complex_type::{ComplexType, UniqueType};
pub use error::{Error, Result};
pub use library::Library;
pub use source::Source;
pub use type_checker::{CheckLevel, Problem, Severity, TypeChecker};
