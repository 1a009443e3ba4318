#[cfg(test)]
mod layer_spec {
    use approx::assert_abs_diff_eq;
    use cambium::backend::{Native, Shaping};
    use cambium::layer::*;
    use cambium::layers::*;
    use cambium::tensor::{from_shape_vec, Ports, Tensor};

    fn ports(entries: &[(&str, &Tensor)]) -> Ports {
        entries.iter().map(|&(port, t)| (port.to_owned(), t.clone())).collect()
    }

    fn ramp(shape: &[usize]) -> Tensor {
        let len = shape.iter().product();
        from_shape_vec(shape, (0..len).map(|i| (i as f32 * 0.37).sin()).collect()).unwrap()
    }

    #[test]
    fn create_every_layer_type() {
        let configs = vec![
            LayerConfig::new("linear", LayerType::Linear),
            LayerConfig::new("sigmoid", LayerType::Sigmoid),
            LayerConfig::new("relu", LayerType::ReLU),
            LayerConfig::new("tanh", LayerType::TanH),
            LayerConfig::new("pool", PoolingConfig::new(PoolingMode::Max, 2)),
            LayerConfig::new("drop", DropoutConfig::default()),
            LayerConfig::new("lrn", LrnConfig::default()),
            LayerConfig::new("fc", FullyConnectedConfig { num_output: 10 }),
            LayerConfig::new("conv", ConvolutionConfig::new(8, 3)),
        ];
        for cfg in configs {
            let cfg = cfg.add_input("x").add_output("y");
            assert!(Layer::<Native>::from_config(&cfg).is_ok(), "{}", cfg.name);
        }

        let concat = LayerConfig::new("concat", ConcatConfig::default())
            .add_input("a")
            .add_input("b")
            .add_output("y");
        assert!(Layer::<Native>::from_config(&concat).is_ok());
        let loss = LayerConfig::new("loss", LayerType::SoftmaxLoss)
            .add_input("ip")
            .add_input("label")
            .add_output("prob");
        assert!(Layer::<Native>::from_config(&loss).is_ok());
        let accuracy = LayerConfig::new("accuracy", LayerType::Accuracy)
            .add_input("ip")
            .add_input("label");
        assert!(Layer::<Native>::from_config(&accuracy).is_ok());
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        let group = ConvolutionConfig {
            group: 3,
            ..ConvolutionConfig::new(8, 3)
        };
        let cfg = LayerConfig::new("conv", group).add_input("x").add_output("y");
        assert!(Layer::<Native>::from_config(&cfg).is_err());

        let cfg = LayerConfig::new("drop", DropoutConfig { dropout_ratio: 1. })
            .add_input("x")
            .add_output("y");
        assert!(Layer::<Native>::from_config(&cfg).is_err());

        let cfg = LayerConfig::new("lrn", LrnConfig { local_size: 4, ..LrnConfig::default() })
            .add_input("x")
            .add_output("y");
        assert!(Layer::<Native>::from_config(&cfg).is_err());

        let cfg = LayerConfig::new("concat", ConcatConfig::default()).add_output("y");
        assert!(Layer::<Native>::from_config(&cfg).is_err());

        assert!("MAXIMUM".parse::<PoolingMode>().is_err());
        assert_eq!("AVE".parse::<PoolingMode>().unwrap(), PoolingMode::Average);
    }

    #[test]
    fn dropout_passes_through_outside_training() {
        let backend = Native::with_seed(3);
        let cfg = LayerConfig::new("drop", DropoutConfig::default())
            .add_input("x")
            .add_output("x");
        let mut layer = Layer::<Native>::from_config(&cfg).unwrap();
        let x = ramp(&[4, 4, 1, 2]);

        let y = layer.forward(&backend, &ports(&[("x", &x)]), Phase::Test).unwrap();
        assert_eq!(y["x"], x);
        let dx = layer.backward(&backend, &ports(&[("x", &x)]), Phase::Test).unwrap();
        assert_eq!(dx["x"], x);
    }

    #[test]
    fn dropout_backward_reuses_mask() {
        let backend = Native::with_seed(11);
        let cfg = LayerConfig::new("drop", DropoutConfig::default())
            .add_input("x")
            .add_output("y");
        let mut layer = Layer::<Native>::from_config(&cfg).unwrap();
        let ones = from_shape_vec(&[8, 8, 1, 1], vec![1.; 64]).unwrap();

        let y = layer.forward(&backend, &ports(&[("x", &ones)]), Phase::Train).unwrap();
        assert!(y["y"].iter().all(|&v| v == 0. || v == 2.));
        assert!(y["y"].iter().any(|&v| v == 0.));
        assert!(y["y"].iter().any(|&v| v == 2.));

        let dx = layer.backward(&backend, &ports(&[("y", &ones)]), Phase::Train).unwrap();
        assert_eq!(dx["x"], y["y"]);
    }

    #[test]
    fn fully_connected_gradient_has_input_shape() {
        let backend = Native::new();
        let cfg = LayerConfig::new("fc", FullyConnectedConfig { num_output: 4 })
            .add_input("x")
            .add_output("ip");
        let mut layer = Layer::<Native>::from_config(&cfg).unwrap();
        let x = ramp(&[3, 2, 2, 5]);

        let y = layer.forward(&backend, &ports(&[("x", &x)]), Phase::Train).unwrap();
        assert_eq!(y["ip"].shape(), &[4, 5]);
        let g = from_shape_vec(&[4, 5], vec![1.; 20]).unwrap();
        let dx = layer.backward(&backend, &ports(&[("ip", &g)]), Phase::Train).unwrap();
        assert_eq!(dx["x"].shape(), x.shape());

        let weights = layer.worker.learnable_weights().unwrap();
        assert_eq!(weights.weight_gradient().unwrap().shape(), &[4, 12]);
        assert_eq!(weights.bias_gradient().unwrap().shape(), &[4, 1]);
        assert!(layer.has_gradients());
    }

    #[test]
    fn convolution_gradient_has_input_shape() {
        let backend = Native::new();
        let conv = ConvolutionConfig {
            pad: 1,
            group: 2,
            ..ConvolutionConfig::new(6, 3)
        };
        let cfg = LayerConfig::new("conv", conv).add_input("x").add_output("y");
        let mut layer = Layer::<Native>::from_config(&cfg).unwrap();
        let x = ramp(&[5, 5, 4, 2]);

        let y = layer.forward(&backend, &ports(&[("x", &x)]), Phase::Train).unwrap();
        assert_eq!(y["y"].shape(), &[5, 5, 6, 2]);
        let dx = layer.backward(&backend, &ports(&[("y", &ramp(&[5, 5, 6, 2]))]), Phase::Train).unwrap();
        assert_eq!(dx["x"].shape(), x.shape());
        let weights = layer.worker.learnable_weights().unwrap();
        assert_eq!(weights.weight_gradient().unwrap().shape(), &[3, 3, 2, 6]);
        assert_eq!(weights.bias_gradient().unwrap().shape(), &[6]);
    }

    fn convolution(num_output: usize, group: usize, filter: Tensor, bias: Tensor) -> Layer<Native> {
        let conv = ConvolutionConfig {
            pad: 1,
            group,
            ..ConvolutionConfig::new(num_output, 3)
        };
        let cfg = LayerConfig::new("conv", conv).add_input("x").add_output("y");
        let mut layer = Layer::<Native>::from_config(&cfg).unwrap();
        layer.worker.learnable_weights_mut().unwrap().set(filter, bias);
        layer
    }

    #[test]
    fn group_convolution_matches_separate_convolutions() {
        let backend = Native::new();
        let x = ramp(&[4, 4, 4, 2]);
        let filter = ramp(&[3, 3, 2, 4]);
        let bias = from_shape_vec(&[4], vec![0.1, -0.2, 0.3, -0.4]).unwrap();
        let gradient = ramp(&[4, 4, 4, 2]);

        let mut grouped = convolution(4, 2, filter.clone(), bias.clone());
        let y = grouped.forward(&backend, &ports(&[("x", &x)]), Phase::Train).unwrap();
        let dx = grouped.backward(&backend, &ports(&[("y", &gradient)]), Phase::Train).unwrap();
        let grouped_weights = grouped.worker.learnable_weights().unwrap();

        for g in 0..2 {
            let mut part = convolution(
                2,
                1,
                backend.slice(&filter, 3, 2 * g, 2).unwrap(),
                backend.slice(&bias, 0, 2 * g, 2).unwrap(),
            );
            let x_part = backend.slice(&x, 2, 2 * g, 2).unwrap();
            let g_part = backend.slice(&gradient, 2, 2 * g, 2).unwrap();
            let y_part = part.forward(&backend, &ports(&[("x", &x_part)]), Phase::Train).unwrap();
            let dx_part = part.backward(&backend, &ports(&[("y", &g_part)]), Phase::Train).unwrap();
            let part_weights = part.worker.learnable_weights().unwrap();

            assert_abs_diff_eq!(backend.slice(&y["y"], 2, 2 * g, 2).unwrap(), y_part["y"], epsilon = 1e-5);
            assert_abs_diff_eq!(backend.slice(&dx["x"], 2, 2 * g, 2).unwrap(), dx_part["x"], epsilon = 1e-5);
            assert_abs_diff_eq!(
                backend
                    .slice(grouped_weights.weight_gradient().unwrap(), 3, 2 * g, 2)
                    .unwrap(),
                part_weights.weight_gradient().unwrap().clone(),
                epsilon = 1e-5
            );
            assert_abs_diff_eq!(
                backend
                    .slice(grouped_weights.bias_gradient().unwrap(), 0, 2 * g, 2)
                    .unwrap(),
                part_weights.bias_gradient().unwrap().clone(),
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn concat_follows_caffe_axis_numbering() {
        let backend = Native::new();
        let cfg = LayerConfig::new("concat", ConcatConfig::default())
            .add_input("a")
            .add_input("b")
            .add_output("y");
        let mut layer = Layer::<Native>::from_config(&cfg).unwrap();
        let a = ramp(&[2, 2, 1, 3]);
        let b = ramp(&[2, 2, 2, 3]);
        let y = layer.forward(&backend, &ports(&[("a", &a), ("b", &b)]), Phase::Test).unwrap();
        // concat_dim 1 counts from the batch axis, so channels are joined
        assert_eq!(y["y"].shape(), &[2, 2, 3, 3]);

        let dx = layer.backward(&backend, &ports(&[("y", &y["y"])]), Phase::Test).unwrap();
        assert_eq!(dx["a"], a);
        assert_eq!(dx["b"], b);
    }

    #[test]
    fn pooling_and_lrn_keep_batch_last() {
        let backend = Native::new();
        let pool = LayerConfig::new("pool", PoolingConfig { stride: 2, ..PoolingConfig::new(PoolingMode::Average, 2) })
            .add_input("x")
            .add_output("y");
        let mut pool = Layer::<Native>::from_config(&pool).unwrap();
        let x = ramp(&[4, 4, 3, 2]);
        let y = pool.forward(&backend, &ports(&[("x", &x)]), Phase::Train).unwrap();
        assert_eq!(y["y"].shape(), &[2, 2, 3, 2]);
        let dx = pool.backward(&backend, &ports(&[("y", &y["y"])]), Phase::Train).unwrap();
        assert_eq!(dx["x"].shape(), x.shape());

        let lrn = LayerConfig::new("norm", LrnConfig::default()).add_input("x").add_output("x");
        let mut lrn = Layer::<Native>::from_config(&lrn).unwrap();
        let y = lrn.forward(&backend, &ports(&[("x", &x)]), Phase::Train).unwrap();
        assert_eq!(y["x"].shape(), x.shape());
        let dx = lrn.backward(&backend, &ports(&[("x", &x)]), Phase::Train).unwrap();
        assert_eq!(dx["x"].shape(), x.shape());
    }
}
