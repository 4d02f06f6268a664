//! Random ground-truth parameters for synthetic networks.
//!
//! Discrete nodes get one Dirichlet draw per parent assignment; continuous
//! nodes get coefficients picked from a fixed set of weights. Both fill every
//! node of the matching kind, replacing any attached distribution.
//! [`random_levels`] gives every node a random number of levels first.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Dirichlet, Distribution as _};

use crate::config::{DiscreteParameters, GaussianParameters, LevelParameters};
use crate::distribution::discrete::all_assignments;
use crate::distribution::{Cpt, Distribution, LinearGaussian};
use crate::model::Domain;
use crate::network::Network;
use crate::storage::GraphBackend;
use crate::{Error, Result};

/// Make every node discrete with a uniformly drawn number of levels in
/// `config.min_levels..=config.max_levels`, labelled `"0"`, `"1"`, …. Nodes
/// are visited in insertion order. A node whose domain changes loses its
/// distribution, and so do its children.
pub fn random_levels<D, B, R>(network: &mut Network<D, B>, config: &LevelParameters, rng: &mut R) -> Result<()>
where
    B: GraphBackend,
    R: Rng + ?Sized,
{
    config.validate()?;
    for id in network.vertex_ids() {
        let n_levels = rng.gen_range(config.min_levels..=config.max_levels);
        network.set_domain_of(id, Domain::discrete((0..n_levels).map(|l| l.to_string())))?;
    }
    Ok(())
}

/// Fill every discrete node with a random CPT. Every parent of a discrete
/// node must be discrete.
pub fn random_discrete_parameters<B, R>(
    network: &mut Network<Distribution, B>,
    config: &DiscreteParameters,
    rng: &mut R,
) -> Result<()>
where
    B: GraphBackend,
    R: Rng + ?Sized,
{
    if !config.alpha.is_finite() || config.alpha <= 0.0 {
        return Err(Error::InvalidParameters(format!("alpha must be positive, got {}", config.alpha)));
    }
    for id in network.vertex_ids() {
        let schema = network.schema_of(id)?;
        let Some(n_levels) = schema.domain.cardinality() else { continue };
        let name = schema.name.to_string();

        let mut cpt = Cpt::from_schema(&schema)?;
        let concentration = if config.normalise_alpha { config.alpha / n_levels as f64 } else { config.alpha };
        let cardinalities: Vec<usize> = cpt.parent_levels().iter().map(Vec::len).collect();

        for assignment in all_assignments(&cardinalities) {
            let row = if n_levels == 1 {
                vec![1.0]
            } else {
                let dirichlet = Dirichlet::new(&vec![concentration; n_levels])
                    .map_err(|e| Error::InvalidParameters(format!("dirichlet for '{name}': {e}")))?;
                let row: Vec<f64> = dirichlet.sample(rng);
                // Tiny concentrations can underflow every gamma draw to zero.
                if row.iter().any(|p| !p.is_finite()) {
                    return Err(Error::InvalidParameters(format!(
                        "dirichlet draw for '{name}' degenerated: alpha {} gives concentration {concentration:e} \
                         per level, too small to sample",
                        config.alpha
                    )));
                }
                row
            };
            cpt.set_row_at(assignment, row)?;
        }
        network.attach_distribution(&name, cpt.into())?;
    }
    Ok(())
}

/// Fill every continuous node with random linear-Gaussian parameters. Every
/// parent of a continuous node must be continuous.
pub fn random_gaussian_parameters<B, R>(
    network: &mut Network<Distribution, B>,
    config: &GaussianParameters,
    rng: &mut R,
) -> Result<()>
where
    B: GraphBackend,
    R: Rng + ?Sized,
{
    if config.weights.is_empty() {
        return Err(Error::InvalidParameters("weights must not be empty".into()));
    }
    if !config.noise_std.is_finite() || config.noise_std < 0.0 {
        return Err(Error::InvalidParameters(format!(
            "noise_std must be finite and non-negative, got {}",
            config.noise_std
        )));
    }
    for id in network.vertex_ids() {
        let schema = network.schema_of(id)?;
        if !schema.domain.is_continuous() {
            continue;
        }
        if let Some((parent, _)) = schema.parents.iter().find(|(_, d)| !d.is_continuous()) {
            return Err(schema.shape_error(format!("parent '{parent}' is discrete")));
        }
        let name = schema.name.to_string();
        let coefficients = schema
            .parents
            .iter()
            .map(|_| config.weights.choose(rng).copied())
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| Error::InvalidParameters("weights must not be empty".into()))?;

        let gaussian = LinearGaussian::new(config.intercept, coefficients, config.noise_std * config.noise_std)?;
        network.attach_distribution(&name, gaussian.into())?;
    }
    Ok(())
}

/// Bijective base-26 column names: `A`..`Z`, `AA`, `AB`, ….
pub fn node_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Conditional;
    use crate::model::{Domain, Value};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_node_name() {
        assert_eq!(node_name(0), "A");
        assert_eq!(node_name(25), "Z");
        assert_eq!(node_name(26), "AA");
        assert_eq!(node_name(27), "AB");
        assert_eq!(node_name(701), "ZZ");
        assert_eq!(node_name(702), "AAA");
    }

    #[test]
    fn test_random_levels_in_range() {
        let mut net: Network = Network::from_modelstring("[A][B|A][C|A:B][D]", Domain::Continuous).unwrap();
        let config = LevelParameters { min_levels: 2, max_levels: 4 };
        random_levels(&mut net, &config, &mut StdRng::seed_from_u64(8)).unwrap();

        for node in net.nodes() {
            let levels = node.domain.levels().unwrap();
            assert!((2..=4).contains(&levels.len()), "{}: {levels:?}", node.name);
            assert_eq!(levels[0], "0");
            assert_eq!(levels[1], "1");
        }
        random_discrete_parameters(&mut net, &DiscreteParameters::default(), &mut StdRng::seed_from_u64(9)).unwrap();
        assert!(net.is_fully_fitted());
    }

    #[test]
    fn test_random_levels_drops_distributions() {
        let mut net: Network = Network::from_modelstring("[A][B|A]", Domain::binary()).unwrap();
        random_discrete_parameters(&mut net, &DiscreteParameters::default(), &mut StdRng::seed_from_u64(1)).unwrap();
        let config = LevelParameters { min_levels: 3, max_levels: 3 };
        random_levels(&mut net, &config, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(net.unfitted_nodes(), vec!["A", "B"]);
        assert_eq!(net.node("B").unwrap().domain, Domain::discrete(["0", "1", "2"]));

        let bad = LevelParameters { min_levels: 1, max_levels: 3 };
        assert!(matches!(
            random_levels(&mut net, &bad, &mut StdRng::seed_from_u64(2)),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_discrete_rows_complete_and_normalised() {
        let mut net: Network = Network::from_modelstring("[A][B|A][C|A:B]", Domain::discrete(["x", "y", "z"])).unwrap();
        random_discrete_parameters(&mut net, &DiscreteParameters::default(), &mut StdRng::seed_from_u64(3)).unwrap();
        assert!(net.is_fully_fitted());

        let c = net.distribution("C").unwrap().unwrap().as_discrete().unwrap();
        assert!(c.is_complete());
        assert_eq!(c.combinations(), 9);
        for (_, row) in c.sorted_rows() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_discrete_is_seeded() {
        let build = |seed| {
            let mut net: Network = Network::from_modelstring("[A][B|A]", Domain::binary()).unwrap();
            random_discrete_parameters(&mut net, &DiscreteParameters::default(), &mut StdRng::seed_from_u64(seed)).unwrap();
            net.distribution("B").unwrap().cloned()
        };
        assert_eq!(build(1), build(1));
        assert_ne!(build(1), build(2));
    }

    #[test]
    fn test_underflowing_alpha_names_node() {
        let mut net = Network::new();
        net.add_node("A", Domain::binary()).unwrap();
        let config = DiscreteParameters { alpha: 1e-300, normalise_alpha: true };
        let err = random_discrete_parameters(&mut net, &config, &mut StdRng::seed_from_u64(0)).unwrap_err();
        match err {
            Error::InvalidParameters(message) => {
                assert!(message.contains("'A'"), "{message}");
                assert!(message.contains("alpha"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(net.distribution("A").unwrap().is_none());
    }

    #[test]
    fn test_single_level_node() {
        let mut net = Network::new();
        net.add_node("A", Domain::discrete(["only"])).unwrap();
        random_discrete_parameters(&mut net, &DiscreteParameters::default(), &mut StdRng::seed_from_u64(0)).unwrap();
        let a = net.distribution("A").unwrap().unwrap();
        assert_eq!(a.probability_of(&Value::from("only"), &[]).unwrap(), 1.0);
    }

    #[test]
    fn test_gaussian_weights_from_config() {
        let mut net: Network = Network::from_modelstring("[A][B][C|A:B]", Domain::Continuous).unwrap();
        let config = GaussianParameters::default();
        random_gaussian_parameters(&mut net, &config, &mut StdRng::seed_from_u64(5)).unwrap();
        let c = net.distribution("C").unwrap().unwrap().as_gaussian().unwrap();
        assert_eq!(c.coefficients().len(), 2);
        assert!(c.coefficients().iter().all(|w| config.weights.contains(w)));
        assert_eq!(c.variance(), 1.0);
    }

    #[test]
    fn test_mixed_parents_rejected() {
        let mut net = Network::new();
        net.add_node("D", Domain::binary()).unwrap();
        net.add_node("X", Domain::Continuous).unwrap();
        net.add_edge("D", "X").unwrap();
        let err = random_gaussian_parameters(&mut net, &GaussianParameters::default(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { ref node, .. } if node == "X"));

        let mut net = Network::new();
        net.add_node("X", Domain::Continuous).unwrap();
        net.add_node("D", Domain::binary()).unwrap();
        net.add_edge("X", "D").unwrap();
        let err = random_discrete_parameters(&mut net, &DiscreteParameters::default(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
