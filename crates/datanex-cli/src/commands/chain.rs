use crate::cli::{AddressArgs, BlockArgs, TxArgs};
use crate::client::{AppContext, CliResult};
use crate::output::{render_document, render_gas};

pub(crate) async fn handle_chain_address(ctx: &AppContext, args: AddressArgs) -> CliResult<()> {
    let report = ctx
        .dashboard
        .lookup_address(&args.address)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}

pub(crate) async fn handle_chain_tx(ctx: &AppContext, args: TxArgs) -> CliResult<()> {
    let report = ctx
        .dashboard
        .lookup_transaction(&args.tx_hash)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}

pub(crate) async fn handle_chain_block(ctx: &AppContext, args: BlockArgs) -> CliResult<()> {
    let report = ctx
        .dashboard
        .lookup_block(&args.block_number)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}

pub(crate) async fn handle_chain_gas(ctx: &AppContext) -> CliResult<()> {
    let prices = ctx
        .dashboard
        .gas_prices()
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_gas(&prices, ctx.output)
}

pub(crate) async fn handle_chain_contract(ctx: &AppContext, args: AddressArgs) -> CliResult<()> {
    let report = ctx
        .dashboard
        .lookup_contract(&args.address)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}
