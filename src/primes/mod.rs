/// Trial division primality test.
pub fn is_prime(n: u64) -> bool {
    match n {
        0 | 1 => false,
        2 | 3 => true,
        _ if n % 2 == 0 => false,
        _ => {
            let mut i = 3;
            while i <= n / i {
                if n % i == 0 {
                    return false;
                }
                i += 2;
            }
            true
        }
    }
}
