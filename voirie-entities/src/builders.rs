pub trait Builder {
    type Build;
    fn build() -> Self::Build;
}

pub use self::normalized_address_builder::*;

pub mod normalized_address_builder {

    use super::*;
    use crate::address::*;

    #[derive(Debug)]
    pub struct NormalizedAddressBuild {
        addr: NormalizedAddress,
    }

    impl NormalizedAddressBuild {
        pub fn house_number(mut self, n: HouseNumber) -> Self {
            self.addr.house_number = n;
            self
        }
        pub fn street(mut self, street_key: &str) -> Self {
            self.addr.street_key = street_key.into();
            self
        }
        pub fn cleaned(mut self, cleaned: &str) -> Self {
            self.addr.cleaned = cleaned.into();
            self
        }
        pub fn finish(mut self) -> NormalizedAddress {
            if self.addr.cleaned.is_empty() {
                self.addr.cleaned = street_query(self.addr.house_number, &self.addr.street_key);
            }
            self.addr
        }
    }

    impl Builder for NormalizedAddress {
        type Build = NormalizedAddressBuild;
        fn build() -> Self::Build {
            Self::Build {
                addr: NormalizedAddress {
                    house_number: 0,
                    street_key: UNKNOWN_STREET.into(),
                    cleaned: "".into(),
                },
            }
        }
    }
}
