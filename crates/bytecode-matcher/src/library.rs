use crate::transformation::{MatchValues, Transformation};
use std::collections::BTreeMap;
use thiserror::Error;
use verifier_types::ByteRange;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("link reference {id} offset {start}..{end} is out of range")]
    OutOfRange { id: String, start: usize, end: usize },
    #[error("library {id} has inconsistent on-chain values across its occurrences")]
    InconsistentOccurrences { id: String },
}

/// Replaces each unlinked library slot in `code` with the address declared
/// in `library_addresses`. `code`'s `link_references` entries are slots the
/// compiler driver zero-filled because solc left them as raw
/// `__$<34 hex>$__` placeholder characters, which do not hex-decode — this
/// is where they actually get resolved. Where no declared address exists,
/// the address is recovered from the corresponding bytes in `on_chain` (the
/// on-chain deployment already has it linked) and returned via `recovered`.
pub fn link_libraries(
    code: &mut [u8],
    link_references: &BTreeMap<String, Vec<ByteRange>>,
    library_addresses: &BTreeMap<String, [u8; 20]>,
    on_chain: &[u8],
    transformations: &mut Vec<Transformation>,
    values: &mut MatchValues,
    recovered: &mut BTreeMap<String, [u8; 20]>,
) -> Result<(), LinkError> {
    for (id, ranges) in link_references {
        let declared = library_addresses.get(id).copied();
        let mut resolved: Option<[u8; 20]> = declared;

        for range in ranges {
            let start = range.start;
            let end = start + range.length;
            if code.len() < end || on_chain.len() < end {
                return Err(LinkError::OutOfRange {
                    id: id.clone(),
                    start,
                    end,
                });
            }

            let address = match resolved {
                Some(address) => address,
                None => {
                    let on_chain_slot = &on_chain[start..end];
                    let address = <[u8; 20]>::try_from(on_chain_slot)
                        .map_err(|_| LinkError::InconsistentOccurrences { id: id.clone() })?;
                    resolved = Some(address);
                    recovered.insert(id.clone(), address);
                    address
                }
            };

            if let Some(previous) = resolved {
                if previous != address {
                    return Err(LinkError::InconsistentOccurrences { id: id.clone() });
                }
            }

            code[start..end].copy_from_slice(&address);
            transformations.push(Transformation::library(start, id.clone()));
            values.add_library(id.clone(), address.to_vec());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recovers_unresolved_library_from_on_chain_bytes() {
        let mut code = vec![0u8; 25];
        let on_chain_address = [0xABu8; 20];
        let mut on_chain = vec![0u8; 25];
        on_chain[2..22].copy_from_slice(&on_chain_address);

        let mut link_references = BTreeMap::new();
        link_references.insert(
            "Lib.sol:Lib".to_string(),
            vec![ByteRange {
                start: 2,
                length: 20,
            }],
        );

        let mut transformations = Vec::new();
        let mut values = MatchValues::default();
        let mut recovered = BTreeMap::new();

        link_libraries(
            &mut code,
            &link_references,
            &BTreeMap::new(),
            &on_chain,
            &mut transformations,
            &mut values,
            &mut recovered,
        )
        .unwrap();

        assert_eq!(&code[2..22], &on_chain_address[..]);
        assert_eq!(recovered.get("Lib.sol:Lib"), Some(&on_chain_address));
        assert_eq!(transformations.len(), 1);
    }

    #[test]
    fn uses_declared_address_when_available() {
        let mut code = vec![0u8; 25];
        let declared_address = [0xCDu8; 20];
        let on_chain = vec![0u8; 25];

        let mut link_references = BTreeMap::new();
        link_references.insert(
            "Lib.sol:Lib".to_string(),
            vec![ByteRange {
                start: 2,
                length: 20,
            }],
        );
        let mut library_addresses = BTreeMap::new();
        library_addresses.insert("Lib.sol:Lib".to_string(), declared_address);

        let mut transformations = Vec::new();
        let mut values = MatchValues::default();
        let mut recovered = BTreeMap::new();

        link_libraries(
            &mut code,
            &link_references,
            &library_addresses,
            &on_chain,
            &mut transformations,
            &mut values,
            &mut recovered,
        )
        .unwrap();

        assert_eq!(&code[2..22], &declared_address[..]);
        assert!(recovered.is_empty());
    }
}
