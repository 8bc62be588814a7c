use efficient_pls::{PlsOptions, PLS};
use ndarray::array;

fn main() {
    env_logger::init();

    let training = array![[0.1, 0.02], [0.25, 1.01], [0.95, 0.01], [1.01, 0.96]];
    let targets = array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]];

    let mut pls = PLS::new();
    pls.train(training.clone(), targets, &PlsOptions::new(2, 1e-5))
        .expect("PLS training failed");

    println!("Latent components: {:?}", pls.n_components());
    println!("R2X (last component): {:?}", pls.explained_variance());
    println!("Predictions:\n{}", pls.predict(training).expect("prediction failed"));
}
