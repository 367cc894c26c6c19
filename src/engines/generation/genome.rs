pub use crate::types::render;
use crate::types::Token;

/// Genome representation for genetic programming
///
/// A genome is the program itself: an ordered token sequence executed from
/// left to right by the stack machine. Tokens are opcode names, integer
/// literals or string literals.
///
/// # Why a flat sequence?
///
/// - **Crossover**: a single cut point and two slices
/// - **Mutation**: substitute, delete or insert one token
/// - **No invalid states**: any sequence is a runnable program; bad ones
///   simply fault and score poorly
///
/// Two genomes with equal token sequences behave identically, so a genome
/// carries no identity beyond its contents.
///
/// # Example
///
/// ```
/// use stackgp::engines::generation::genome::{render, Genome};
/// use stackgp::types::Token;
///
/// let genome: Genome = vec![Token::Integer(100), Token::Integer(23), Token::opcode("+")];
/// assert_eq!(render(&genome), "100 23 +");
/// ```
pub type Genome = Vec<Token>;
