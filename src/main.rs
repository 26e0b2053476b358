use ordskip::{Options, SkipList};
use tracing_subscriber::EnvFilter;

fn main() -> ordskip::Result<()> {
    use rand::Rng;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = rand::thread_rng();
    let mut l: SkipList<u32, u32, 4> =
        SkipList::with_options(Options::default().with_probability(0.5))?;
    l.insert(50, 50);
    for _ in 0..20 {
        let k = rng.gen::<u32>() % 100;
        l.insert(k, k);
    }
    println!("{:?}", l);

    let pred = l.find_last_less_than(&50);
    println!("before 50: {:?}", l.key(pred));
    if let Some(node) = l.find_first(&50) {
        println!("{:?}", l.entry(node));
        l.delete(node)?;
        // a second delete through the same handle is rejected
        println!("{:?}", l.delete(node));
    }
    println!("{:?}", l.get(&50));
    println!("{:?}", l);
    Ok(())
}
