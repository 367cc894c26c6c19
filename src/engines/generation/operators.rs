use crate::engines::generation::{generator::Generator, genome::Genome};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Substitution,
    Deletion,
    Insertion,
}

/// Single-point crossover: prefix of `a`, suffix of `b`
///
/// The cut point is uniform over `0..=min(len(a), len(b))`, so the child may
/// be all of `b` (cut at 0) or keep the whole shorter prefix of `a`. Segments
/// are not aligned by meaning.
pub fn crossover<R: Rng>(a: &Genome, b: &Genome, rng: &mut R) -> Genome {
    let point = rng.gen_range(0..=a.len().min(b.len()));
    crossover_at(a, b, point)
}

/// `a[..point]` followed by `b[point..]`; `point` is clamped to both lengths.
pub fn crossover_at(a: &Genome, b: &Genome, point: usize) -> Genome {
    let point = point.min(a.len()).min(b.len());
    let mut child = Vec::with_capacity(b.len());
    child.extend_from_slice(&a[..point]);
    child.extend_from_slice(&b[point..]);
    child
}

/// Mutation: with probability `rate`, change one token in place
///
/// Returns whether the genome changed. Empty genomes are left alone.
pub fn mutate<R: Rng>(
    genome: &mut Genome,
    mutation_rate: f64,
    generator: &Generator,
    rng: &mut R,
) -> bool {
    if rng.gen::<f64>() >= mutation_rate {
        return false;
    }
    apply_mutation(genome, generator, rng).is_some()
}

/// Unconditionally substitutes (1/2), deletes (1/4) or inserts (1/4) one
/// token at a uniformly chosen position.
pub fn apply_mutation<R: Rng>(
    genome: &mut Genome,
    generator: &Generator,
    rng: &mut R,
) -> Option<MutationKind> {
    let kind = rng.gen::<f64>();
    if genome.is_empty() {
        return None;
    }
    let i = rng.gen_range(0..genome.len());

    if kind <= 0.5 {
        genome[i] = generator.random_token(rng);
        Some(MutationKind::Substitution)
    } else if kind <= 0.75 {
        genome.remove(i);
        Some(MutationKind::Deletion)
    } else {
        let token = generator.random_token(rng);
        genome.insert(i, token);
        Some(MutationKind::Insertion)
    }
}
