//! # ミントトランザクション構築
//!
//! Candy Guard経由のmintV2命令を手組みする。Anchor規約のdiscriminatorと
//! 勘定リストを組み立て、compute budget命令を先頭に付けた未署名
//! トランザクションを生成する。fee payerはミントするユーザー本人で、
//! サーバー側ではその場で生成したアセット鍵のみが署名する。

use std::str::FromStr;

use sha2::{Digest, Sha256};
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_program;
use solana_sdk::sysvar;
use solana_sdk::transaction::Transaction;

use crate::config::MintProgramConfig;

// ---------------------------------------------------------------------------
// プログラムID
// ---------------------------------------------------------------------------

/// Candy Guardプログラム。
pub fn candy_guard_program_id() -> Pubkey {
    Pubkey::from_str("Guard1JwRhJkVH6XZhzoYxeBVQe872VH6QggF4BWmS9g").unwrap()
}

/// Candy Machine Coreプログラム。
pub fn candy_machine_program_id() -> Pubkey {
    Pubkey::from_str("CndyV3LdqHUfDLmE5naZjVN8rBZz4tqhdefbAnjHG3JR").unwrap()
}

/// Token Metadataプログラム。
pub fn token_metadata_program_id() -> Pubkey {
    Pubkey::from_str("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s").unwrap()
}

/// SPL Tokenプログラム。
pub fn spl_token_program_id() -> Pubkey {
    Pubkey::from_str("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA").unwrap()
}

/// Associated Token Accountプログラム。
pub fn ata_program_id() -> Pubkey {
    Pubkey::from_str("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL").unwrap()
}

// ---------------------------------------------------------------------------
// PDA導出
// ---------------------------------------------------------------------------

/// Candy Machineのauthority PDA。
pub fn candy_machine_authority_pda(candy_machine: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"candy_machine", candy_machine.as_ref()],
        &candy_machine_program_id(),
    )
}

/// ミントに対するメタデータPDA。
pub fn metadata_pda(mint: &Pubkey) -> (Pubkey, u8) {
    let program_id = token_metadata_program_id();
    Pubkey::find_program_address(
        &[b"metadata", program_id.as_ref(), mint.as_ref()],
        &program_id,
    )
}

/// ミントに対するマスターエディションPDA。
pub fn master_edition_pda(mint: &Pubkey) -> (Pubkey, u8) {
    let program_id = token_metadata_program_id();
    Pubkey::find_program_address(
        &[b"metadata", program_id.as_ref(), mint.as_ref(), b"edition"],
        &program_id,
    )
}

/// Associated Token Accountのアドレス。
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            owner.as_ref(),
            spl_token_program_id().as_ref(),
            mint.as_ref(),
        ],
        &ata_program_id(),
    )
}

/// コレクションdelegate recordのPDA。
/// Candy Machineのauthority PDAがコレクションへの書き込み権限を持つ。
pub fn collection_delegate_record_pda(
    collection_mint: &Pubkey,
    collection_authority: &Pubkey,
    delegate: &Pubkey,
) -> (Pubkey, u8) {
    let program_id = token_metadata_program_id();
    Pubkey::find_program_address(
        &[
            b"metadata",
            program_id.as_ref(),
            collection_mint.as_ref(),
            b"collection_delegate",
            collection_authority.as_ref(),
            delegate.as_ref(),
        ],
        &program_id,
    )
}

// ---------------------------------------------------------------------------
// mintV2命令
// ---------------------------------------------------------------------------

/// Anchor規約のmintV2命令discriminator（sha256("global:mint_v2")の先頭8バイト）。
fn mint_v2_discriminator() -> [u8; 8] {
    let digest = Sha256::digest(b"global:mint_v2");
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&digest[..8]);
    discriminator
}

/// Candy GuardへのmintV2命令を構築する。
/// `minter`がfee payer兼受け取り主体、`nft_mint`は新規アセットのミント鍵。
pub fn build_mint_v2_instruction(
    cfg: &MintProgramConfig,
    minter: &Pubkey,
    nft_mint: &Pubkey,
) -> Instruction {
    let (authority_pda, _) = candy_machine_authority_pda(&cfg.candy_machine);
    let (nft_metadata, _) = metadata_pda(nft_mint);
    let (nft_master_edition, _) = master_edition_pda(nft_mint);
    let (token_account, _) = associated_token_address(minter, nft_mint);
    let (collection_metadata, _) = metadata_pda(&cfg.collection_mint);
    let (collection_master_edition, _) = master_edition_pda(&cfg.collection_mint);
    let (collection_delegate_record, _) = collection_delegate_record_pda(
        &cfg.collection_mint,
        &cfg.collection_authority,
        &authority_pda,
    );

    let accounts = vec![
        AccountMeta::new_readonly(cfg.candy_guard, false),
        AccountMeta::new_readonly(candy_machine_program_id(), false),
        AccountMeta::new(cfg.candy_machine, false),
        AccountMeta::new(authority_pda, false),
        // payerとminterは同一ウォレット。どちらも署名必須
        AccountMeta::new(*minter, true),
        AccountMeta::new(*minter, true),
        // 新規アセットのミントアカウント。サーバー側で生成した鍵が署名する
        AccountMeta::new(*nft_mint, true),
        AccountMeta::new_readonly(*minter, true),
        AccountMeta::new(nft_metadata, false),
        AccountMeta::new(nft_master_edition, false),
        AccountMeta::new(token_account, false),
        // 未使用のオプショナルアカウント（tokenRecord）はプログラムIDで埋める
        AccountMeta::new_readonly(candy_guard_program_id(), false),
        AccountMeta::new_readonly(collection_delegate_record, false),
        AccountMeta::new_readonly(cfg.collection_mint, false),
        AccountMeta::new(collection_metadata, false),
        AccountMeta::new_readonly(collection_master_edition, false),
        AccountMeta::new_readonly(cfg.collection_authority, false),
        AccountMeta::new_readonly(token_metadata_program_id(), false),
        AccountMeta::new_readonly(spl_token_program_id(), false),
        AccountMeta::new_readonly(ata_program_id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
        AccountMeta::new_readonly(sysvar::slot_hashes::id(), false),
        // solPaymentガードの支払い先（remaining account）
        AccountMeta::new(cfg.payment_destination, false),
    ];

    // solPaymentガードは引数バイトを持たないため、mint_argsは空
    let mut data = mint_v2_discriminator().to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());
    // label: None
    data.push(0);

    Instruction {
        program_id: candy_guard_program_id(),
        accounts,
        data,
    }
}

// ---------------------------------------------------------------------------
// トランザクション構築
// ---------------------------------------------------------------------------

/// compute budget 2命令とmintV2命令からなる未署名トランザクションを構築する。
/// 署名スロットは必須署名者の数だけ空で確保する。
pub fn build_mint_tx(
    cfg: &MintProgramConfig,
    minter: &Pubkey,
    nft_mint: &Pubkey,
    blockhash: &Hash,
) -> Transaction {
    let instructions = vec![
        ComputeBudgetInstruction::set_compute_unit_limit(cfg.compute_unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(cfg.compute_unit_price),
        build_mint_v2_instruction(cfg, minter, nft_mint),
    ];

    let message = Message::new_with_blockhash(&instructions, Some(minter), blockhash);
    let num_signers = message.header.num_required_signatures as usize;

    Transaction {
        signatures: vec![Signature::default(); num_signers],
        message,
    }
}

// ---------------------------------------------------------------------------
// 署名ヘルパー
// ---------------------------------------------------------------------------

/// 構築済みトランザクションへ署名を部分適用する。
/// 指定pubkeyが必須署名者に含まれない場合はエラー。
pub fn apply_partial_signature(
    tx: &mut Transaction,
    signer: &Pubkey,
    signature_bytes: &[u8],
) -> Result<(), String> {
    let signature = Signature::try_from(signature_bytes)
        .map_err(|_| "署名のバイト長が不正です".to_string())?;

    let num_signers = tx.message.header.num_required_signatures as usize;
    let position = tx
        .message
        .account_keys
        .iter()
        .take(num_signers)
        .position(|key| key == signer)
        .ok_or_else(|| format!("{signer} は必須署名者ではありません"))?;

    tx.signatures[position] = signature;
    Ok(())
}

/// トランザクションをワイヤ形式（bincode）へシリアライズする。
pub fn serialize_transaction(tx: &Transaction) -> Result<Vec<u8>, String> {
    bincode::serialize(tx).map_err(|e| format!("トランザクションのシリアライズに失敗: {e}"))
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
