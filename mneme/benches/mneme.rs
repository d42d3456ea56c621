use divan::Bencher;
use mneme::{Displacements, Field, Natural, SingleStorage, Storage, StridedView};
use mneme_error::MnemeUnwrap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    divan::main();
}

struct Dof;
impl Field for Dof {
    type Type = f64;
    type Alloc = Natural;
}

fn random_counts(len: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..len).map(|_| rng.random_range(0..16)).collect()
}

#[divan::bench(args = [1_000, 100_000, 1_000_000])]
fn build_table(bencher: Bencher, len: usize) {
    let counts = random_counts(len);
    bencher.bench(|| Displacements::new(&counts));
}

#[divan::bench(args = [1_000, 100_000])]
fn iterate_pairs(bencher: Bencher, len: usize) {
    let displs = Displacements::new(&random_counts(len));
    bencher.bench(|| displs.iter().map(|(element, item)| element ^ item).sum::<usize>());
}

#[divan::bench(args = [1_000, 100_000])]
fn iterate_nested(bencher: Bencher, len: usize) {
    let displs = Displacements::new(&random_counts(len));
    bencher.bench(|| {
        let mut sum = 0;
        for element in 0..displs.len() {
            for item in displs[element]..displs[element + 1] {
                sum += element ^ item;
            }
        }
        sum
    });
}

#[divan::bench(consts = [1, 4, 10], args = [10_000, 100_000])]
fn strided_traversal<const STRIDE: usize>(bencher: Bencher, len: usize) {
    let displs = Displacements::new(&vec![STRIDE; len]);
    let mut storage = SingleStorage::<Dof>::try_new(displs.total()).mneme_unwrap();
    bencher.bench_local(|| {
        let mut view =
            StridedView::<_, STRIDE>::try_new(&displs, &mut storage, 0, len).mneme_unwrap();
        for (k, items) in view.iter_mut().enumerate() {
            for (l, item) in items.iter_mut().enumerate() {
                *item = (k + l) as f64;
            }
        }
        storage.len()
    });
}
