use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};
use crate::layers::dense::Dense;
use crate::math::matrix::Matrix;
use crate::network::metadata::ModelMetadata;
use crate::network::model::{Model, NoGrad, ParamMut};
use crate::network::spec::NetworkSpec;

/// Stack of dense layers trained with manual backpropagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Dense>,
    #[serde(default)]
    pub metadata: ModelMetadata,
    #[serde(skip, default = "default_grad_enabled")]
    grad_enabled: bool,
}

fn default_grad_enabled() -> bool {
    true
}

impl Network {
    /// Wraps already-built layers. Adjacent layers must chain.
    pub fn new(layers: Vec<Dense>) -> Result<Network> {
        if layers.is_empty() {
            return Err(TrainError::InvalidConfig("network needs at least one layer".into()));
        }
        for pair in layers.windows(2) {
            if pair[1].input_size() != pair[0].size() {
                return Err(TrainError::ShapeMismatch {
                    what: "layer input size",
                    got: pair[1].input_size(),
                    expected: pair[0].size(),
                });
            }
        }
        Ok(Network { layers, metadata: ModelMetadata::default(), grad_enabled: true })
    }

    /// Builds and initialises a network from its architecture description.
    /// The same `seed` always yields the same initial weights.
    pub fn from_spec(spec: &NetworkSpec, seed: Option<u64>) -> Result<Network> {
        spec.validate()?;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let layers = spec.layers.iter()
            .map(|l| Dense::new(l.size, l.input_size, l.activation.clone(), &mut rng))
            .collect();
        let mut network = Network::new(layers)?;
        if let Some(metadata) = &spec.metadata {
            network.metadata = metadata.clone();
        }
        Ok(network)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size())
    }

    /// Class predicted for each row of `input` (argmax of the scores).
    pub fn predict(&mut self, input: &Matrix) -> Result<Vec<usize>> {
        let scores = NoGrad::new(self).forward(input)?;
        Ok((0..scores.rows).map(|r| scores.argmax_row(r)).collect())
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let network: Network = serde_json::from_reader(reader)?;
        Network::new(network.layers).map(|n| Network { metadata: network.metadata, ..n })
    }
}

impl Model for Network {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let track = self.grad_enabled;
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current, track)?;
        }
        Ok(current)
    }

    fn backward(&mut self, grad_output: &Matrix) -> Result<()> {
        let mut delta = grad_output.clone();
        for layer in self.layers.iter_mut().rev() {
            delta = layer.backward(&delta)?;
        }
        Ok(())
    }

    fn zero_grad(&mut self) {
        self.layers.iter_mut().for_each(Dense::zero_grad);
    }

    fn parameters(&self) -> Vec<&Matrix> {
        self.layers.iter().flat_map(|l| [&l.weights, &l.biases]).collect()
    }

    fn parameters_mut(&mut self) -> Vec<ParamMut<'_>> {
        self.layers.iter_mut()
            .flat_map(|l| l.params_mut())
            .map(|(value, grad)| ParamMut { value, grad })
            .collect()
    }

    fn grad_enabled(&self) -> bool {
        self.grad_enabled
    }

    fn set_grad_enabled(&mut self, enabled: bool) -> bool {
        if !enabled {
            self.layers.iter_mut().for_each(Dense::clear_tape);
        }
        std::mem::replace(&mut self.grad_enabled, enabled)
    }

    fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::model::snapshot;
    use crate::network::spec::LayerSpec;

    fn spec() -> NetworkSpec {
        NetworkSpec {
            name: "tiny".into(),
            layers: vec![
                LayerSpec { size: 4, input_size: 3, activation: ActivationFunction::ReLU },
                LayerSpec { size: 2, input_size: 4, activation: ActivationFunction::Identity },
            ],
            metadata: None,
        }
    }

    #[test]
    fn from_spec_is_deterministic_under_a_seed() {
        let a = Network::from_spec(&spec(), Some(3)).unwrap();
        let b = Network::from_spec(&spec(), Some(3)).unwrap();
        assert_eq!(snapshot(&a), snapshot(&b));
        assert_eq!(a.num_classes(), 2);
        assert_eq!(a.input_size(), 3);
    }

    #[test]
    fn new_rejects_layers_that_do_not_chain() {
        let mut rng = StdRng::seed_from_u64(0);
        let layers = vec![
            Dense::new(4, 3, ActivationFunction::ReLU, &mut rng),
            Dense::new(2, 5, ActivationFunction::Identity, &mut rng),
        ];
        assert!(matches!(Network::new(layers), Err(TrainError::ShapeMismatch { .. })));
    }

    #[test]
    fn no_grad_scope_blocks_backward_and_restores_tracking() {
        let mut net = Network::from_spec(&spec(), Some(1)).unwrap();
        {
            let mut guard = NoGrad::new(&mut net);
            assert!(!guard.grad_enabled());
            guard.forward(&Matrix::zeros(2, 3)).unwrap();
            assert!(matches!(
                guard.backward(&Matrix::zeros(2, 2)),
                Err(TrainError::GradientsDisabled)
            ));
        }
        assert!(net.grad_enabled());
    }

    #[test]
    fn no_grad_restores_tracking_on_error_paths() {
        fn failing_eval(net: &mut Network) -> Result<Matrix> {
            let mut guard = NoGrad::new(net);
            guard.forward(&Matrix::zeros(1, 7))
        }
        let mut net = Network::from_spec(&spec(), Some(1)).unwrap();
        assert!(failing_eval(&mut net).is_err());
        assert!(net.grad_enabled());
    }

    #[test]
    fn predict_returns_argmax_without_recording_gradients() {
        let weights = Matrix::zeros(3, 2);
        let biases = Matrix::from_vec(1, 2, vec![0.0, 1.0]).unwrap();
        let layer = Dense::from_parts(weights, biases, ActivationFunction::Identity).unwrap();
        let mut net = Network::new(vec![layer]).unwrap();

        assert_eq!(net.predict(&Matrix::zeros(2, 3)).unwrap(), vec![1, 1]);
        assert!(net.grad_enabled());
        assert!(matches!(
            net.backward(&Matrix::zeros(2, 2)),
            Err(TrainError::GradientsDisabled)
        ));
    }

    #[test]
    fn parameters_mut_follows_parameter_order() {
        let mut net = Network::from_spec(&spec(), Some(9)).unwrap();
        let shapes: Vec<_> = net.parameters().iter().map(|p| p.shape()).collect();
        let mut_shapes: Vec<_> = net.parameters_mut().iter().map(|p| p.value.shape()).collect();
        assert_eq!(shapes, vec![(3, 4), (1, 4), (4, 2), (1, 2)]);
        assert_eq!(shapes, mut_shapes);
    }

    #[test]
    fn json_round_trip_keeps_weights_and_labels() {
        let mut net = Network::from_spec(&spec(), Some(5)).unwrap();
        net.metadata.output_labels = Some(vec!["cat".into(), "dog".into()]);
        let path = std::env::temp_dir().join(format!("epoch-trainer-net-{}.json", std::process::id()));
        let path = path.to_str().unwrap();

        net.save_json(path).unwrap();
        let loaded = Network::load_json(path).unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(snapshot(&loaded), snapshot(&net));
        assert_eq!(loaded.metadata.output_labels, net.metadata.output_labels);
        assert!(loaded.grad_enabled());
    }
}
